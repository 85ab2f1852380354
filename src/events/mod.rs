//! # Events Module
//!
//! Progress and lifecycle events, so any front end (CLI, GUI, web) can
//! follow a scan without the engine knowing who is listening.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Scan(ScanEvent::Progress(p)) => println!("Found {} images", p.images_found),
//!             Event::Compare(CompareEvent::Progress(p)) => println!("{:.0}%", p.fraction * 100.0),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
