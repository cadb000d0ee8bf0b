//! Prompt synthesis example - no network access needed.
//!
//! Run with: `cargo run --example print_prompt -- lip_filler=3 nose_filler=8`

use treatviz::{Selection, Treatment};

fn main() {
    let mut selection = Selection::new();
    for arg in std::env::args().skip(1) {
        let (id, intensity) = arg.split_once('=').unwrap_or((arg.as_str(), "5"));
        selection.push(id, intensity.parse().unwrap_or(5));
    }

    if selection.is_empty() {
        for treatment in Treatment::ALL {
            println!("{:<22} {}", treatment.id(), treatment.fragment(5));
        }
        return;
    }

    for unknown in selection.unknown_treatments() {
        eprintln!("skipping unknown treatment: {unknown}");
    }
    println!("{}", selection.prompt());
}
