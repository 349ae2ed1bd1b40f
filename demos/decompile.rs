use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;

use dexview::dex::DexFile;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: decompile <classes.dex> [out-dir]");
        std::process::exit(2);
    }
    let out_dir = args.get(2).map(String::as_str).unwrap_or("out");

    // Do everything else with the error trap
    match process_dex(&args[1], out_dir) {
        Ok(count) => {
            println!("All done: wrote {} classes to {}/", count, out_dir);
        }
        Err(e) => {
            println!("Aborted due to error: {:?}", e);
        }
    }
}

/* This is where all the processing takes place, to make error handling easier */
fn process_dex(dex_file: &str, out_dir: &str) -> Result<usize, Box<dyn Error>> {
    let dex = DexFile::from_file(Path::new(dex_file))?;
    let out = dex.to_pseudocode(None);

    let out_root = Path::new(out_dir);
    fs::create_dir_all(out_root)?;

    // One file per class, decompiled_<N>.txt
    for (n, class) in out.classes.iter().enumerate() {
        let path = out_root.join(format!("decompiled_{}.txt", n));
        fs::write(&path, class.text())?;
    }

    if !out.faults.is_clean() {
        println!(
            "Recovered faults: {} bad strings, {} dangling indices, {} unknown opcodes, {} truncated methods",
            out.faults.string_decode,
            out.faults.index_out_of_range,
            out.faults.unsupported_opcode,
            out.faults.truncated_stream
        );
    }

    Ok(out.classes.len())
}
