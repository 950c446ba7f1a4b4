//! Output generation for the digest.
//!
//! - [`email`]: renders the digest into the HTML and plain-text email bodies
//!
//! Nothing is written to disk; the rendered message is handed to the
//! [`crate::mailer`] (or printed on `--dry-run`).

pub mod email;
