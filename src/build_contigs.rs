// This file contains the code for the asmval build_contigs subcommand, which runs an external
// contig builder on the read alignments of one or more samples.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use rayon::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::external::{Redirect, Step};
use crate::log::{section_header, explanation, warning};
use crate::misc::{check_if_file_exists, check_requirements, create_dir, quit_with_error};


/// Settings file in the same format as the workflow's config.json.
#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct BuildConfig {
    pub reference: Option<PathBuf>,
    pub nthreads: Option<usize>,
}

impl BuildConfig {
    pub fn from_file(config_file: &Path) -> Self {
        let content = fs::read_to_string(config_file).unwrap_or_else(|e| {
            quit_with_error(&format!("could not read {}\n{}", config_file.display(), e))
        });
        serde_json::from_str(&content).unwrap_or_else(|e| {
            quit_with_error(&format!("failed to parse {}\n{}", config_file.display(), e))
        })
    }
}


#[derive(Clone, Debug)]
pub struct SampleJob {
    pub sample: String,
    pub out_dir: PathBuf,
    pub sam: PathBuf,
    pub contigs: PathBuf,
    pub log: PathBuf,
}

impl SampleJob {
    pub fn new(sample: &str) -> Self {
        // A sample can be given with a leading directory (e.g. runs/s1), in which case its files
        // are named after the last component.
        let out_dir = PathBuf::from(format!("{}.assembly.out", sample));
        let name = Path::new(sample).file_name().unwrap_or_default().to_string_lossy().to_string();
        SampleJob { sample: sample.to_string(),
                    sam: out_dir.join(format!("{}.sam", name)),
                    contigs: out_dir.join("contigs.fasta"),
                    log: out_dir.join(format!("{}.assembly.log", name)),
                    out_dir }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.contigs.is_file()
    }

    pub fn builder_step(&self, builder: &str, reference: &Path) -> Step {
        Step::new(builder).arg("-r").path_arg(reference)
                          .arg("-s").path_arg(&self.sam)
                          .arg("-o").path_arg(&self.out_dir)
                          .arg("-c").arg(2)
                          .arg("-l").arg(300)
                          .arg("-n").arg("T")
                          .arg("-b").arg("T")
                          .arg("-u").arg("T")
                          .arg("-k").arg("breadth")
                          .redirect(Redirect::CombinedAppend(self.log.clone()))
    }

    pub fn run(&self, builder: &str, reference: &Path) -> Result<(), String> {
        create_dir(&self.out_dir);
        self.builder_step(builder, reference).run()?;
        if !self.contigs.is_file() {
            return Err(format!("{} was not created", self.contigs.display()));
        }
        Ok(())
    }
}


pub fn build_contigs(config: Option<PathBuf>, reference: Option<PathBuf>, samples: Vec<String>,
                     threads: Option<usize>, builder: String) {
    let (reference, threads) = resolve_settings(config.as_deref(), reference, threads);
    check_settings(&reference, threads, &samples);
    starting_message();
    print_settings(&config, &reference, &samples, threads, &builder);
    let jobs: Vec<SampleJob> = samples.iter().map(|s| SampleJob::new(s)).collect();
    check_inputs(&jobs);
    let pending = pending_jobs(&jobs);
    if !pending.is_empty() {
        check_requirements(&[builder.as_str()]);
    }
    let failures = run_jobs(&pending, &builder, &reference, threads);
    finished_message(&jobs, &failures);
}


fn resolve_settings(config: Option<&Path>, reference: Option<PathBuf>, threads: Option<usize>)
        -> (PathBuf, usize) {
    // Command-line options take precedence over the config file.
    let file_config = config.map(BuildConfig::from_file).unwrap_or_default();
    let reference = reference.or(file_config.reference).unwrap_or_else(|| {
        quit_with_error("a reference is required, either with --reference or in the config file")
    });
    let threads = threads.or(file_config.nthreads).unwrap_or(1);
    (reference, threads)
}


fn check_settings(reference: &Path, threads: usize, samples: &[String]) {
    check_if_file_exists(reference);
    if threads < 1 {
        quit_with_error("--threads must be at least 1");
    }
    if samples.is_empty() {
        quit_with_error("at least one sample is required");
    }
}


fn check_inputs(jobs: &[SampleJob]) {
    for job in jobs {
        if !job.is_up_to_date() {
            check_if_file_exists(&job.sam);
        }
    }
}


fn starting_message() {
    section_header("Starting asmval build_contigs");
    explanation("This command builds contigs from each sample's read alignments using an \
                 external contig builder. Samples which already have contigs are skipped.");
}


fn print_settings(config: &Option<PathBuf>, reference: &Path, samples: &[String], threads: usize,
                  builder: &str) {
    eprintln!("Settings:");
    if let Some(config) = config {
        eprintln!("  --config {}", config.display());
    }
    eprintln!("  --reference {}", reference.display());
    eprintln!("  --samples {}", samples.join(" "));
    eprintln!("  --threads {}", threads);
    eprintln!("  --builder {}", builder);
    eprintln!();
}


fn pending_jobs(jobs: &[SampleJob]) -> Vec<SampleJob> {
    jobs.iter().filter(|job| {
        if job.is_up_to_date() {
            eprintln!("{}: contigs already built, skipping", job.sample);
            false
        } else {
            true
        }
    }).cloned().collect()
}


fn run_jobs(jobs: &[SampleJob], builder: &str, reference: &Path,
            threads: usize) -> Vec<String> {
    if jobs.is_empty() {
        return Vec::new();
    }
    section_header("Building contigs");
    explanation("The contig builder is now run for each sample. Its output is appended to the \
                 sample's log file.");
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()
        .unwrap_or_else(|e| quit_with_error(&format!("failed to create thread pool\n{}", e)));
    let failures: Vec<String> = pool.install(|| {
        jobs.par_iter().filter_map(|job| {
            eprintln!("{}", job.builder_step(builder, reference));
            match job.run(builder, reference) {
                Ok(_)  => None,
                Err(e) => {
                    warning(&format!("{}: {}", job.sample, e));
                    Some(job.sample.clone())
                },
            }
        }).collect()
    });
    eprintln!();
    failures
}


fn finished_message(jobs: &[SampleJob], failures: &[String]) {
    section_header("Finished!");
    for job in jobs {
        if !failures.contains(&job.sample) {
            eprintln!("{}: {}", job.sample, job.contigs.display());
        }
    }
    eprintln!();
    if !failures.is_empty() {
        quit_with_error(&format!("contig building failed for: {}", failures.join(", ")));
    }
}
