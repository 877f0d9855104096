use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zfq::CodecKind;

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
zfq version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   lossless, self-verifying FastQ compression";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    arg_required_else_help = true,
    flatten_help = true,
    styles = STYLES
)]
pub struct Cli {
    /// the log level, overriding RUST_LOG (error, warn, info, debug, trace or off)
    #[arg(short = 'l', long, global = true)]
    pub log_level: Option<log::LevelFilter>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress a FastQ file to zfq. The input can be gzipped.
    #[command(arg_required_else_help = true)]
    Compress {
        /// the input .fastq or .fastq.gz
        #[arg(short, long)]
        input: PathBuf,

        /// the output .zfq
        #[arg(short, long)]
        output: PathBuf,

        /// the number of compression threads
        #[arg(short, long, default_value_t = 1)]
        threads: usize,

        /// remove the input file once the output has been verified
        #[arg(short, long, action)]
        remove: bool,

        /// the channel compressor
        #[arg(long, value_enum, default_value = "zstd")]
        codec: CodecKind,

        /// directory for the decompressed copy of a gzipped input.
        /// defaults to the directory of the output file
        #[arg(long, verbatim_doc_comment)]
        tmp_dir: Option<PathBuf>,
    },

    /// Uncompress a zfq file to FastQ.
    #[command(arg_required_else_help = true, visible_alias = "decompress")]
    Uncompress {
        /// the input .zfq
        #[arg(short, long)]
        input: PathBuf,

        /// the output .fastq, gzipped if the name ends with .gz
        #[arg(short, long)]
        output: PathBuf,

        /// remove the input file once the output has been verified
        #[arg(short, long, action)]
        remove: bool,
    },

    /// Print the number of sequences, number of nucleotides, md5 and modification time of the
    /// original file, without decompressing it.
    #[command(arg_required_else_help = true)]
    Info {
        /// the input .zfq
        #[arg(short, long)]
        input: PathBuf,

        /// pretty-print, with a human readable modification time
        #[arg(long, action)]
        pretty: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_compress() {
        let cli = Cli::parse_from([
            "zfq", "compress", "-i", "in.fastq", "-o", "out.zfq", "-t", "3", "-r",
        ]);
        match cli.command {
            Commands::Compress {
                threads,
                remove,
                codec,
                ..
            } => {
                assert_eq!(threads, 3);
                assert!(remove);
                assert_eq!(codec, CodecKind::Zstd);
            }
            _ => panic!("expected compress"),
        }
    }

    #[test]
    fn decompress_alias_and_log_level() {
        let cli = Cli::parse_from(["zfq", "decompress", "-i", "a.zfq", "-o", "a.fq", "-l", "debug"]);
        assert!(matches!(cli.command, Commands::Uncompress { .. }));
        assert_eq!(cli.log_level, Some(log::LevelFilter::Debug));
    }
}
