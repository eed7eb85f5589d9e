//! Output generation for articles, the manifest, and the index page.
//!
//! # Submodules
//!
//! - [`markup`]: Converts the body markdown subset to HTML and places images
//! - [`article`]: Renders and writes one self-contained article document
//! - [`json`]: Writes the `articles.json` manifest
//! - [`indexes`]: Writes the `index.html` listing
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 전기차-충전-전쟁.html     # one document per article
//! ├── 전기차-충전-전쟁-1.html   # title collision
//! ├── articles.json             # manifest of the last run
//! └── index.html                # listing of the last run
//! ```

pub mod article;
pub mod indexes;
pub mod json;
pub mod markup;
