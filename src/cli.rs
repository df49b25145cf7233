use crate::constants::DEFAULT_TARGET_KB;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fit-squeeze",
    about = "Shrink images and PDFs to fit under a target file size",
    long_about = "fit-squeeze brings JPEG, PNG and WebP images under a target size by searching \
                  over resolution and JPEG quality, and compacts PDFs by re-serializing them with \
                  stream compression. Files are processed one at a time; an output is never larger \
                  than its input.",
    version,
    after_help = "EXAMPLES:\n  \
    fit-squeeze compress photo.png -o ./out\n  \
    fit-squeeze compress ./scans \"./photos/*.jpg\" -o ./out -t 150 -r\n  \
    fit-squeeze compress big.webp -o ./out --tuning tuning.json -v\n  \
    fit-squeeze info report.pdf"
)]
pub struct Args {
    #[arg(
        short = 'q',
        long,
        global = true,
        help = "Only print errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Print per-item details and debug diagnostics",
        long_help = "Print per-item details and enable debug diagnostics on stderr. \
                     RUST_LOG overrides the diagnostic filter."
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress files to fit a target size",
        long_about = "Compress images and PDFs so that each output fits under the target size. \
                      Outputs are written as <name>-min<ext> into the output directory. Items \
                      that cannot reach the target are still written and marked 'Limit reached'."
    )]
    Compress {
        #[arg(
            required = true,
            help = "Input files, directories, or glob patterns",
            long_help = "Any mix of file paths, directories and glob expressions. \
                         Examples: 'photo.png', './scans', './photos/*.{jpg,png}'"
        )]
        inputs: Vec<String>,

        #[arg(short = 'o', long, help = "Output directory path")]
        output: PathBuf,

        #[arg(
            short = 't',
            long = "target-kb",
            default_value_t = DEFAULT_TARGET_KB,
            value_parser = clap::value_parser!(u64).range(1..),
            help = "Target size per file in KB",
            long_help = "Maximum size per output file in kilobytes (1 KB = 1024 bytes). \
                         Images are searched against a stricter internal goal to leave headroom."
        )]
        target_kb: u64,

        #[arg(
            long,
            help = "JSON file overriding search tuning",
            long_help = "JSON file with any of: size_correction, min_scale, max_scale, \
                         baseline_quality, retry_quality_factor, min_quality. \
                         Missing fields keep their defaults."
        )]
        tuning: Option<PathBuf>,

        #[arg(
            short = 'r',
            long,
            help = "Process subdirectories recursively",
            long_help = "Recursively process all subdirectories when an input is a directory."
        )]
        recursive: bool,
    },

    #[command(
        about = "Show file details and the planned compression",
        long_about = "Display media type, size, pixel dimensions or page count, and the \
                      resolution scale the image search would start from."
    )]
    Info {
        #[arg(help = "File path to analyze")]
        input: PathBuf,

        #[arg(
            short = 't',
            long = "target-kb",
            default_value_t = DEFAULT_TARGET_KB,
            value_parser = clap::value_parser!(u64).range(1..),
            help = "Target size in KB used for the projection"
        )]
        target_kb: u64,
    },
}
