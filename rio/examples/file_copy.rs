//! Reactive file copy
//!
//! This example demonstrates:
//! - Streaming a file's content as a chunk publisher
//! - Feeding that stream into a file write with bounded demand
//! - Waiting on the returned completion
//!
//! Run with `cargo run --example file_copy [src [dst]]`. Without arguments
//! it copies a generated 8 MiB file under the system temp directory.

use std::{env, fs, io, path::PathBuf, process, time::Instant};

use rio::File;

const GENERATED_LEN: usize = 8 * 1024 * 1024;

fn default_pair() -> io::Result<(PathBuf, PathBuf)> {
  let dir = env::temp_dir();
  let src = dir.join("rio-copy-src.bin");
  let dst = dir.join("rio-copy-dst.bin");
  let data: Vec<u8> = (0..GENERATED_LEN).map(|i| (i % 251) as u8).collect();
  fs::write(&src, data)?;
  Ok((src, dst))
}

fn main() -> io::Result<()> {
  let mut args = env::args().skip(1);
  let (src, dst) = match (args.next(), args.next()) {
    (Some(src), Some(dst)) => (PathBuf::from(src), PathBuf::from(dst)),
    (None, None) => default_pair()?,
    _ => {
      eprintln!("usage: file_copy [src dst]");
      process::exit(2);
    }
  };

  let len = fs::metadata(&src)?.len();
  println!("copying {} ({len} bytes)", src.display());

  let started = Instant::now();
  File::new(&dst)
    .write(File::new(&src).content())
    .wait()
    .map_err(io::Error::other)?;
  let elapsed = started.elapsed();

  let mb = len as f64 / (1024.0 * 1024.0);
  println!(
    "copied to {} in {elapsed:?} ({:.1} MiB/s)",
    dst.display(),
    mb / elapsed.as_secs_f64()
  );
  Ok(())
}
