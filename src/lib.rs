//! Blocking client for the WordPress XML-RPC interface.
//!
//! [`WordPressClient`] covers the MetaWeblog, Blogger and MovableType calls a
//! blog tool needs. Everything else is reachable by name through
//! [`ServerProxy`](xmlrpc::ServerProxy):
//!
//! ```no_run
//! use wordpress_xmlrpc::{params, WordPressClient};
//!
//! # fn main() -> wordpress_xmlrpc::Result<()> {
//! let mut wp = WordPressClient::new("https://blog.example/xmlrpc.php", "admin", "secret")?;
//! let post = wp.get_post(42)?;
//! println!("{}", post.title);
//!
//! let options = wp.server_mut().invoke("wp.getOptions", params![1, "admin", "secret"])?;
//! println!("{:?}", options.find_path(&["blog_title", "value"]));
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

#[macro_use]
pub mod xmlrpc;

pub mod config;
pub mod error;
pub mod media;
pub mod methods;
pub mod records;
pub mod wordpress;

pub use crate::config::{Config, Encoding};
pub use crate::error::{Error, Result};
pub use crate::media::MediaObject;
pub use crate::records::{Blog, Category, CustomField, Post, TrackbackPing, User};
pub use crate::wordpress::{WordPressClient, DEFAULT_RECENT_POSTS};
