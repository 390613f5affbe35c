// Build script to ensure Cargo rebuilds when embedded assets change.
// rust-embed embeds the page templates and static assets at compile time, but
// Cargo's incremental compilation may not notice edits to those files.

fn main() {
    println!("cargo:rerun-if-changed=src/assets/");
    println!("cargo:rerun-if-changed=templates/");
}
