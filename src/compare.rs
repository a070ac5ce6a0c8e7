// This file contains the code for comparing each reference genome to its assigned contigs with
// MUMmer (nucmer, delta-filter and dnadiff), either locally or through a job queue.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use clap::ValueEnum;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::external::{Redirect, Step};
use crate::log::{section_header, explanation, warning};
use crate::misc::{format_float, quit_with_error, touch_file};
use crate::reference::Reference;


#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum Executor {
    Local,  // run comparisons on this machine
    Queue,  // submit comparisons to a batch queue
}


#[derive(Clone, Debug)]
pub struct QueueSettings {
    pub submit_cmd: String,
    pub queue: String,
    pub resources: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings { submit_cmd: "tsub".to_string(),
                        queue: "throughput".to_string(),
                        resources: "nodes=1:ppn=1,mem=10gb,walltime=00:30:00".to_string() }
    }
}


#[derive(Clone, Debug)]
pub struct ComparisonJob {
    pub genome_name: String,
    pub steps: Vec<Step>,
    pub done_file: PathBuf,
}

impl ComparisonJob {
    pub fn new(reference: &Reference, result_dir: &Path, min_identity: f64,
               min_length: u32) -> Self {
        let prefix = result_dir.join(&reference.genome_name);
        let with_ext = |ext: &str| result_dir.join(format!("{}.{}", reference.genome_name, ext));
        let log = with_ext("log");
        let delta = with_ext("delta");
        let delta_filt = with_ext("delta.filt");

        let nucmer = Step::new("nucmer").arg("-l").arg(min_length)
                                        .path_arg(&reference.path)
                                        .path_arg(&reference.contigs_file(result_dir))
                                        .arg("-p").path_arg(&prefix)
                                        .redirect(Redirect::Combined(log.clone()));
        let delta_filter = Step::new("delta-filter").arg("-i").arg(format_float(min_identity))
                                                    .arg("-l").arg(min_length)
                                                    .path_arg(&delta)
                                                    .redirect(Redirect::Stdout(delta_filt.clone()));
        let dnadiff = Step::new("dnadiff").arg("-d").path_arg(&delta_filt)
                                          .arg("-p").path_arg(&prefix)
                                          .redirect(Redirect::CombinedAppend(log));
        ComparisonJob { genome_name: reference.genome_name.clone(),
                        steps: vec![nucmer, delta_filter, dnadiff],
                        done_file: reference.done_file(result_dir) }
    }

    pub fn shell_script(&self) -> String {
        let mut commands: Vec<String> = self.steps.iter().map(|s| s.to_string()).collect();
        commands.push(format!("touch {}", self.done_file.display()));
        commands.join("; ")
    }

    pub fn run_locally(&self) {
        // Like the shell script, a failed step doesn't stop later steps and the done file is
        // always written.
        for step in &self.steps {
            if let Err(e) = step.run() {
                warning(&format!("{}: {}", self.genome_name, e));
            }
        }
        touch_file(&self.done_file);
    }

    pub fn submit_step(&self, queue: &QueueSettings) -> Step {
        Step::new(&queue.submit_cmd).arg(self.shell_script())
                                    .arg("-q").arg(&queue.queue)
                                    .arg("-l").arg(&queue.resources)
    }

    pub fn submit(&self, queue: &QueueSettings) {
        // A job that never reached the queue can't write its done file, so it is written here
        // and the genome is reported as NA.
        if let Err(e) = self.submit_step(queue).run() {
            warning(&format!("{}: job submission failed: {}", self.genome_name, e));
            touch_file(&self.done_file);
        }
    }
}


pub fn required_programs(executor: Executor, queue: &QueueSettings) -> Vec<&str> {
    let mut programs = vec!["makeblastdb", "blastn"];
    match executor {
        Executor::Local => programs.extend(["nucmer", "delta-filter", "dnadiff"]),
        Executor::Queue => programs.push(queue.submit_cmd.as_str()),
    }
    programs
}


#[allow(clippy::too_many_arguments)]
pub fn compare_contigs_to_ref(references: &[Reference], contig_counts: &[usize], result_dir: &Path,
                              executor: Executor, queue: &QueueSettings, threads: usize,
                              min_identity: f64, min_length: u32) {
    section_header("Comparing contigs to references");
    explanation("Each reference genome is compared to its contigs using nucmer, delta-filter and \
                 dnadiff. A genome with an existing done file was already compared and is \
                 skipped.");
    touch_file(&result_dir.join("ready.done"));

    let mut jobs = Vec::new();
    for (reference, &count) in references.iter().zip(contig_counts) {
        eprintln!("{}", reference.genome_name);
        let done_file = reference.done_file(result_dir);
        if done_file.exists() {
            eprintln!("  already done");
        } else if count == 0 {
            eprintln!("  no contigs, skipping comparison");
            touch_file(&done_file);
        } else {
            jobs.push(ComparisonJob::new(reference, result_dir, min_identity, min_length));
        }
    }
    eprintln!();
    match executor {
        Executor::Local => run_jobs_locally(&jobs, threads),
        Executor::Queue => submit_jobs(&jobs, queue),
    }
}


fn run_jobs_locally(jobs: &[ComparisonJob], threads: usize) {
    if jobs.is_empty() { return; }
    eprintln!("Running {} comparison{} with {} thread{}",
              jobs.len(), if jobs.len() == 1 { "" } else { "s" },
              threads, if threads == 1 { "" } else { "s" });
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()
        .unwrap_or_else(|e| quit_with_error(&format!("failed to create thread pool\n{}", e)));
    pool.install(|| {
        jobs.par_iter().for_each(|job| {
            job.run_locally();
            eprintln!("  {} finished", job.genome_name);
        });
    });
    eprintln!();
}


fn submit_jobs(jobs: &[ComparisonJob], queue: &QueueSettings) {
    for job in jobs {
        eprintln!("{}", job.submit_step(queue));
        job.submit(queue);
    }
    if !jobs.is_empty() { eprintln!(); }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::read_dir;
    use tempfile::tempdir;

    fn test_reference() -> Reference {
        Reference::new(PathBuf::from("refs/E_coli.fasta"))
    }

    #[test]
    fn test_shell_script() {
        let job = ComparisonJob::new(&test_reference(), Path::new("out"), 95.0, 100);
        assert_eq!(job.shell_script(),
                   "nucmer -l 100 refs/E_coli.fasta out/E_coli.mc.fasta -p out/E_coli \
                    &>out/E_coli.log; \
                    delta-filter -i 95 -l 100 out/E_coli.delta > out/E_coli.delta.filt; \
                    dnadiff -d out/E_coli.delta.filt -p out/E_coli &>>out/E_coli.log 2>&1; \
                    touch out/E_coli.done");
    }

    #[test]
    fn test_custom_thresholds() {
        let job = ComparisonJob::new(&test_reference(), Path::new("out"), 97.5, 250);
        assert_eq!(job.steps[0].args[..2], ["-l".to_string(), "250".to_string()]);
        assert_eq!(job.steps[1].to_string(),
                   "delta-filter -i 97.5 -l 250 out/E_coli.delta > out/E_coli.delta.filt");
    }

    #[test]
    fn test_submit_step() {
        let job = ComparisonJob::new(&test_reference(), Path::new("out"), 95.0, 100);
        let step = job.submit_step(&QueueSettings::default());
        assert_eq!(step.program, "tsub");
        assert_eq!(step.args, vec![job.shell_script(), "-q".to_string(),
                                   "throughput".to_string(), "-l".to_string(),
                                   "nodes=1:ppn=1,mem=10gb,walltime=00:30:00".to_string()]);
    }

    #[test]
    fn test_required_programs() {
        let queue = QueueSettings::default();
        assert_eq!(required_programs(Executor::Local, &queue),
                   vec!["makeblastdb", "blastn", "nucmer", "delta-filter", "dnadiff"]);
        assert_eq!(required_programs(Executor::Queue, &queue),
                   vec!["makeblastdb", "blastn", "tsub"]);
    }

    #[test]
    fn test_run_locally_writes_done_file_on_failure() {
        // The MUMmer tools won't be installed in the test environment, so every step fails.
        let dir = tempdir().unwrap();
        let mut job = ComparisonJob::new(&test_reference(), dir.path(), 95.0, 100);
        for step in &mut job.steps {
            step.program = "definitely_not_a_real_program_xyz".to_string();
        }
        job.run_locally();
        assert!(dir.path().join("E_coli.done").is_file());
    }

    #[test]
    fn test_failed_submission_writes_done_file() {
        let dir = tempdir().unwrap();
        let job = ComparisonJob::new(&test_reference(), dir.path(), 95.0, 100);
        let queue = QueueSettings { submit_cmd: "definitely_not_a_real_program_xyz".to_string(),
                                    ..QueueSettings::default() };
        job.submit(&queue);
        assert!(dir.path().join("E_coli.done").is_file());

        let dir = tempdir().unwrap();
        let job = ComparisonJob::new(&test_reference(), dir.path(), 95.0, 100);
        let queue = QueueSettings { submit_cmd: "false".to_string(), ..QueueSettings::default() };
        job.submit(&queue);
        assert!(dir.path().join("E_coli.done").is_file());
    }

    #[test]
    fn test_successful_submission_leaves_done_file_to_job() {
        let dir = tempdir().unwrap();
        let job = ComparisonJob::new(&test_reference(), dir.path(), 95.0, 100);
        let queue = QueueSettings { submit_cmd: "true".to_string(), ..QueueSettings::default() };
        job.submit(&queue);
        assert!(!dir.path().join("E_coli.done").exists());
    }

    #[test]
    fn test_compare_skips_done_and_empty() {
        let dir = tempdir().unwrap();
        let references = vec![Reference::new(PathBuf::from("refs/a.fasta")),
                              Reference::new(PathBuf::from("refs/b.fasta"))];
        touch_file(&dir.path().join("a.done"));

        // a is already done and b has no contigs, so no external program is run.
        compare_contigs_to_ref(&references, &[3, 0], dir.path(), Executor::Local,
                               &QueueSettings::default(), 1, 95.0, 100);
        let mut names: Vec<String> = read_dir(dir.path()).unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["a.done", "b.done", "ready.done"]);
    }
}
