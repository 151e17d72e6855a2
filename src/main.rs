use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use peeler::ExtractedFile;
use rayon::prelude::*;

/// AppleDouble magic and version.
const APPLEDOUBLE_MAGIC: u32 = 0x0005_1607;
const APPLEDOUBLE_VERSION: u32 = 0x0002_0000;

/// AppleDouble entry IDs.
const AD_ENTRY_RSRC_FORK: u32 = 2;
const AD_ENTRY_FINDER_INFO: u32 = 9;

/// Fixed sizes within the AppleDouble header.
const AD_HEADER_SIZE: u32 = 26; // magic(4) + version(4) + filler(16) + count(2)
const AD_ENTRY_SIZE: u32 = 12; // id(4) + offset(4) + length(4)
const AD_FINDER_LEN: u32 = 32; // FinderInfo(16) + ExtendedFinderInfo(16)

#[derive(Parser, Debug)]
#[command(name = "peeler")]
#[command(version, about = "Unpack classic Mac archives (.hqx, .bin, .sit, .cpt)", long_about = None)]
struct Args {
    /// Path to the archive to unpack
    archive: String,

    /// Output directory (defaults to the current directory)
    output_dir: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let output_dir = PathBuf::from(args.output_dir.as_deref().unwrap_or("."));
    if let Err(e) = fs::create_dir_all(&output_dir) {
        eprintln!("peeler: cannot create '{}': {}", output_dir.display(), e);
        std::process::exit(1);
    }

    let files = match peeler::peel_path(&args.archive) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("peeler: {e}");
            std::process::exit(1);
        }
    };

    if args.verbose {
        println!("Extracting {} files from {}...", files.len(), args.archive);
    }

    // Create all implied directories sequentially, then write files in
    // parallel.
    for file in &files {
        let path = data_fork_path(&output_dir, file);
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("peeler: cannot create directories for '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    let failures = AtomicUsize::new(0);
    files.par_iter().for_each(|file| {
        if let Err(e) = extract_file(&output_dir, file, args.verbose) {
            eprintln!("peeler: failed to write '{}': {}", file.meta.display_name(), e);
            failures.fetch_add(1, Ordering::Relaxed);
        }
    });

    if failures.load(Ordering::Relaxed) > 0 {
        std::process::exit(1);
    }
}

fn data_fork_path(output_dir: &Path, file: &ExtractedFile) -> PathBuf {
    let name = file.meta.display_name();
    if name.is_empty() {
        output_dir.join("unnamed")
    } else {
        output_dir.join(&*name)
    }
}

fn extract_file(output_dir: &Path, file: &ExtractedFile, verbose: bool) -> std::io::Result<()> {
    let path = data_fork_path(output_dir, file);

    if verbose {
        println!(
            "  {} (data: {} bytes, rsrc: {} bytes, type: {}, creator: {}, flags: 0x{:04x})",
            file.meta.display_name(),
            file.data_fork.len(),
            file.resource_fork.len(),
            fourcc(file.meta.mac_type),
            fourcc(file.meta.mac_creator),
            file.meta.finder_flags,
        );
    }

    // The data fork is always written, even when empty: Mac archives track
    // files that carry only a resource fork or metadata.
    fs::write(&path, &file.data_fork)?;

    // Resource fork and Finder metadata travel in an AppleDouble sidecar
    // next to the data fork.
    if !file.resource_fork.is_empty()
        || file.meta.mac_type != 0
        || file.meta.mac_creator != 0
        || file.meta.finder_flags != 0
    {
        let sidecar = sidecar_path(&path);
        let blob = build_appledouble(file);
        let mut f = fs::File::create(sidecar)?;
        f.write_all(&blob)?;
    }

    Ok(())
}

/// `dir/sub/name` becomes `dir/sub/._name`.
fn sidecar_path(data_path: &Path) -> PathBuf {
    let base = data_path.file_name().unwrap_or_default();
    let mut name = std::ffi::OsString::from("._");
    name.push(base);
    data_path.with_file_name(name)
}

/// Assemble an AppleDouble header file with a Finder-info entry and, when
/// present, the resource fork.
fn build_appledouble(file: &ExtractedFile) -> Vec<u8> {
    let has_rsrc = !file.resource_fork.is_empty();
    let num_entries: u16 = if has_rsrc { 2 } else { 1 };
    let finder_offset = AD_HEADER_SIZE + num_entries as u32 * AD_ENTRY_SIZE;
    let rsrc_offset = finder_offset + AD_FINDER_LEN;

    let total = rsrc_offset as usize + if has_rsrc { file.resource_fork.len() } else { 0 };
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(&APPLEDOUBLE_MAGIC.to_be_bytes());
    buf.extend_from_slice(&APPLEDOUBLE_VERSION.to_be_bytes());
    buf.extend_from_slice(&[0u8; 16]);
    buf.extend_from_slice(&num_entries.to_be_bytes());

    // Entry descriptor: Finder info.
    buf.extend_from_slice(&AD_ENTRY_FINDER_INFO.to_be_bytes());
    buf.extend_from_slice(&finder_offset.to_be_bytes());
    buf.extend_from_slice(&AD_FINDER_LEN.to_be_bytes());

    // Entry descriptor: resource fork.
    if has_rsrc {
        buf.extend_from_slice(&AD_ENTRY_RSRC_FORK.to_be_bytes());
        buf.extend_from_slice(&rsrc_offset.to_be_bytes());
        buf.extend_from_slice(&(file.resource_fork.len() as u32).to_be_bytes());
    }

    // Finder info payload: type(4) + creator(4) + flags(2) + 22 zero bytes.
    buf.extend_from_slice(&file.meta.mac_type.to_be_bytes());
    buf.extend_from_slice(&file.meta.mac_creator.to_be_bytes());
    buf.extend_from_slice(&file.meta.finder_flags.to_be_bytes());
    buf.extend_from_slice(&[0u8; 22]);

    if has_rsrc {
        buf.extend_from_slice(&file.resource_fork);
    }

    buf
}

fn fourcc(v: u32) -> String {
    String::from_utf8_lossy(&v.to_be_bytes()).into_owned()
}
