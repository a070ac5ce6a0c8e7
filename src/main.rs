// This is the main file of asmval and where execution starts. It mainly handles the CLI and then
// calls into other files to run whichever subcommand the user chose.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;
use clap::{Parser, Subcommand, crate_version};

mod blast;
mod build_contigs;
mod compare;
mod external;
mod log;
mod metrics;
mod misc;
mod partition;
mod reference;
mod report;
mod validate;
mod wait;

#[cfg(test)]
mod tests;

use compare::{Executor, QueueSettings};
use validate::ValidateSettings;

#[derive(Parser)]
#[clap(name = "asmval",
       version = concat!("v", crate_version!()),
       about = "check a metagenomic assembly by comparing it with reference genomes")]
#[command(author, version, long_about = None, disable_help_subcommand = true,
          propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {

    /// build contigs from per-sample read alignments with an external contig builder
    #[clap(name = "build_contigs")]
    BuildContigs {
        /// JSON config file with "reference" and "nthreads" keys
        #[clap(long = "config")]
        config: Option<PathBuf>,

        /// Reference genome used by the contig builder (overrides the config file)
        #[clap(short = 'r', long = "reference")]
        reference: Option<PathBuf>,

        /// Sample names, each with a <sample>.assembly.out/<sample>.sam input (one or more required)
        #[clap(short = 's', long = "samples", required = true, num_args = 1..)]
        samples: Vec<String>,

        /// Number of samples to build at once (overrides the config file) [default: 1]
        #[clap(short = 't', long = "threads")]
        threads: Option<usize>,

        /// Contig builder executable
        #[clap(long = "builder", default_value = "buildcontig")]
        builder: String,
    },

    /// summarise the dnadiff reports of an existing result directory
    Report {
        /// Folder with reference FASTA files (required)
        #[clap(short = 'f', long = "ref_folder", required = true)]
        ref_folder: PathBuf,

        /// Result directory from a validate run
        #[clap(short = 'r', long = "result_dir", default_value = "./")]
        result_dir: PathBuf,

        /// Summary output table
        #[clap(short = 'o', long = "output", default_value = "assembly_summary.txt")]
        output: PathBuf,

        /// Seconds between checks for finished comparisons
        #[clap(long = "poll_interval", default_value = "10")]
        poll_interval: u64,

        /// Give up after this many seconds of waiting [default: wait forever]
        #[clap(long = "timeout")]
        timeout: Option<u64>,

        /// Keep intermediate MUMmer files
        #[clap(long = "keep_intermediate")]
        keep_intermediate: bool,
    },

    /// check a metagenomic assembly against reference genomes
    Validate {
        /// Metagenomic contig file (required)
        #[clap(short = 'c', long = "contig_file", required = true)]
        contig_file: PathBuf,

        /// Folder with reference FASTA files (required)
        #[clap(short = 'f', long = "ref_folder", required = true)]
        ref_folder: PathBuf,

        /// Result directory (created if it doesn't exist)
        #[clap(short = 'r', long = "result_dir", default_value = "./")]
        result_dir: PathBuf,

        /// Summary output table
        #[clap(short = 'o', long = "output", default_value = "assembly_summary.txt")]
        output: PathBuf,

        /// Number of CPU threads for BLAST and local comparisons
        #[clap(short = 'a', long = "threads", default_value = "1")]
        threads: usize,

        /// Minimum percent identity for BLAST hits and filtered alignments
        #[clap(long = "min_identity", default_value = "95")]
        min_identity: f64,

        /// Minimum length for BLAST words, nucmer matches and filtered alignments
        #[clap(long = "min_length", default_value = "100")]
        min_length: u32,

        /// Where comparisons run
        #[clap(long = "executor", value_enum, default_value = "local")]
        executor: Executor,

        /// Job submission command (queue executor only)
        #[clap(long = "submit_cmd", default_value = "tsub")]
        submit_cmd: String,

        /// Queue name (queue executor only)
        #[clap(long = "queue", default_value = "throughput")]
        queue: String,

        /// Job resource request (queue executor only)
        #[clap(long = "resources", default_value = "nodes=1:ppn=1,mem=10gb,walltime=00:30:00")]
        resources: String,

        /// Seconds between checks for finished comparisons
        #[clap(long = "poll_interval", default_value = "10")]
        poll_interval: u64,

        /// Give up after this many seconds of waiting [default: wait forever]
        #[clap(long = "timeout")]
        timeout: Option<u64>,

        /// Keep intermediate MUMmer files
        #[clap(long = "keep_intermediate")]
        keep_intermediate: bool,
    },
}


fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::BuildContigs { config, reference, samples, threads, builder }) => {
            build_contigs::build_contigs(config, reference, samples, threads, builder);
        },
        Some(Commands::Report { ref_folder, result_dir, output, poll_interval, timeout,
                                keep_intermediate }) => {
            report::report(ref_folder, result_dir, output, poll_interval, timeout,
                           keep_intermediate);
        },
        Some(Commands::Validate { contig_file, ref_folder, result_dir, output, threads,
                                  min_identity, min_length, executor, submit_cmd, queue,
                                  resources, poll_interval, timeout, keep_intermediate }) => {
            let queue = QueueSettings { submit_cmd, queue, resources };
            validate::validate(ValidateSettings { contig_file, ref_folder, result_dir, output,
                                                  threads, min_identity, min_length, executor,
                                                  queue, poll_interval, timeout,
                                                  keep_intermediate });
        },
        None => {}
    }
}
