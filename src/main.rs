//! # image-pairs CLI
//!
//! Command-line interface for the similar image finder.
//!
//! ## Usage
//! ```bash
//! image-pairs scan ~/Pictures
//! image-pairs scan ~/Pictures --verbose --output json
//! ```

mod cli;

use similar_image_finder::Result;

fn main() -> Result<()> {
    similar_image_finder::init_tracing();
    cli::run()
}
