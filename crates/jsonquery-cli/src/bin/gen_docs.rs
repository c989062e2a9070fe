//! Binary that emits command-line options markdown to stdout.
//!
//! Used to refresh the command-line options reference.

fn main() {
    print!("{}", jsonquery_cli::render_options_markdown());
}
