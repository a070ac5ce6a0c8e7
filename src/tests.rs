// This file contains some high-level tests for asmval and functions common to other tests.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{File, read_to_string};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

use crate::blast::parse_best_hits;
use crate::compare::{compare_contigs_to_ref, Executor, QueueSettings};
use crate::metrics::ValidationMetrics;
use crate::misc::touch_file;
use crate::partition::split_contigs;
use crate::reference::{find_references, write_combined_fasta};
use crate::report::{clean_intermediate_files, create_report_file};


pub const DNADIFF_REPORT: &str = "\
/refs/E_coli.fasta /out/E_coli.mc.fasta
NUCMER

                               [REF]                [QRY]
[Sequences]
TotalSeqs                          1                    5
AlignedSeqs               1(100.00%)            3(60.00%)
UnalignedSeqs               0(0.00%)            2(40.00%)

[Bases]
TotalBases                   4641652              4600000
AlignedBases         4512345(97.21%)      4500000(97.83%)
UnalignedBases        129307(2.79%)        100000(2.17%)

[Alignments]
1-to-1                            30                   30
TotalLength                  4512300              4512310
AvgLength                  150411.50            150410.33
AvgIdentity                    99.97                99.98

M-to-M                            32                   32
TotalLength                  4520000              4520010
AvgLength                  141250.00            141250.31
AvgIdentity                    99.90                99.91

[Feature Estimates]
Breakpoints                       62                   62
Relocations                        2                    1
Translocations                     0                    0
Inversions                         0                    0

[SNPs]
TotalSNPs                         57                   57
AT                        10(17.54%)           12(21.05%)
TotalGSNPs                        41                   41
TotalIndels                       12                   12
TotalGIndels                       6                    6
";


pub fn make_test_file(file_path: &Path, contents: &str) {
    let mut file = File::create(file_path).unwrap();
    write!(file, "{}", contents).unwrap();
}


pub fn make_gzipped_test_file(file_path: &Path, contents: &str) {
    let mut file = File::create(file_path).unwrap();
    let mut e = GzEncoder::new(Vec::new(), Compression::default());
    e.write_all(contents.as_bytes()).unwrap();
    let _ = file.write_all(&e.finish().unwrap());
}


#[test]
fn test_pipeline_without_external_tools() {
    // Runs every step of the validate pipeline except the external programs. BLAST output and
    // dnadiff reports are written by hand where those programs would have made them.
    let ref_dir = tempdir().unwrap();
    let result_dir = tempdir().unwrap();
    let out_dir = tempdir().unwrap();
    let results = result_dir.path();

    make_test_file(&ref_dir.path().join("E_coli.fasta"), ">chr\nACGTACGTAC\n");
    make_test_file(&ref_dir.path().join("S_aureus.fasta"), ">chr\nGGGGCCCC\n");
    make_test_file(&ref_dir.path().join("unseen.fa"), ">chr\nTTTTAAAA\n");
    let contig_file = out_dir.path().join("contigs.fasta");
    make_test_file(&contig_file, ">c1\nACGTAC\n>c2\nGTAC\n>c3\nGGGG\n>c4\nNNNN\n");

    let references = find_references(ref_dir.path());
    let names: Vec<_> = references.iter().map(|r| r.genome_name.clone()).collect();
    assert_eq!(names, vec!["E_coli", "S_aureus", "unseen"]);

    write_combined_fasta(&references, &results.join("reference.fasta")).unwrap();
    assert_eq!(read_to_string(results.join("reference.fasta")).unwrap(),
               ">E_coli chr\nACGTACGTAC\n>S_aureus chr\nGGGGCCCC\n>unseen chr\nTTTTAAAA\n");

    let blast_out = results.join("contig_to_ref.blastn");
    make_test_file(&blast_out, "c2\tE_coli\t100.0\nc1\tE_coli\t100.0\nc3\tS_aureus\t100.0\n\
                                c3\tE_coli\t96.0\n");
    let best_hits = parse_best_hits(&blast_out);
    let (counts, total) = split_contigs(&contig_file, &best_hits, &references, results);
    assert_eq!(counts, vec![2, 1, 0]);
    assert_eq!(total, 4);

    // E_coli was compared in an earlier run, S_aureus is accepted by the queue (whose submission
    // command does nothing) and unseen has no contigs.
    touch_file(&results.join("E_coli.done"));
    make_test_file(&results.join("E_coli.report"), DNADIFF_REPORT);
    make_test_file(&results.join("E_coli.delta"), "");
    make_test_file(&results.join("E_coli.delta.filt"), "");
    let queue = QueueSettings { submit_cmd: "true".to_string(), ..Default::default() };
    compare_contigs_to_ref(&references, &counts, results, Executor::Queue, &queue, 1, 95.0, 100);
    assert!(results.join("ready.done").is_file());
    assert!(results.join("unseen.done").is_file());
    assert!(!results.join("S_aureus.done").exists());

    // The queue job finishes some time later.
    let s_aureus_done = results.join("S_aureus.done");
    let s_aureus_report = results.join("S_aureus.report");
    let finisher = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        make_test_file(&s_aureus_report, "TotalBases 8 100\nAlignedBases 6(75.00%) 90(90.00%)\n\
                                          AlignedSeqs 1(100.00%) 1(100.00%)\n");
        touch_file(&s_aureus_done);
    });
    let output = out_dir.path().join("assembly_summary.txt");
    let summaries = create_report_file(&references, results, &output, Duration::from_millis(10),
                                       Some(Duration::from_secs(30)));
    finisher.join().unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(read_to_string(&output).unwrap(),
               "genome_name\tnb_contig\ttotal_ref_bases\taligned_bases\t%_ref_recovered\t\
                %_avg_identity\tavg_alignment_len\ttotal_snps\ttotal_gsnps\n\
                E_coli\t3\t4641652\t4512345\t97.2142\t99.98\t150411.50\t57\t41\n\
                S_aureus\t1\t8\t6\t75.0000\tNA\tNA\tNA\tNA\n\
                unseen\t0\tNA\tNA\tNA\tNA\tNA\tNA\tNA\n");

    assert_eq!(clean_intermediate_files(results), 2);
    assert!(results.join("E_coli.report").is_file());

    let yaml = results.join("validation.yaml");
    let mut metrics = ValidationMetrics::new();
    metrics.genomes = summaries;
    metrics.save_to_yaml(&yaml);
    assert_eq!(ValidationMetrics::load_or_default(&yaml).genomes.len(), 3);
}


#[test]
fn test_failed_submission_does_not_block_report() {
    // When the queue rejects a job, the wait still ends and that genome gets an NA row.
    let ref_dir = tempdir().unwrap();
    let result_dir = tempdir().unwrap();
    let results = result_dir.path();
    make_test_file(&ref_dir.path().join("g.fasta"), ">chr\nACGT\n");
    let references = find_references(ref_dir.path());
    make_test_file(&references[0].contigs_file(results), ">c1\nACGT\n");

    let queue = QueueSettings { submit_cmd: "definitely_not_a_real_program_xyz".to_string(),
                                ..Default::default() };
    compare_contigs_to_ref(&references, &[1], results, Executor::Queue, &queue, 1, 95.0, 100);
    assert!(results.join("g.done").is_file());

    let output = results.join("assembly_summary.txt");
    let summaries = create_report_file(&references, results, &output, Duration::from_millis(10),
                                       Some(Duration::from_secs(5)));
    assert_eq!(summaries[0].tsv_row(), "g\tNA\tNA\tNA\tNA\tNA\tNA\tNA\tNA");
}
