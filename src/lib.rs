// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Content-aware image resizing.
//!
//! Load pixels into a `Carver`, ask it for a new width or height, and
//! read the image back.  Seams of low-energy pixels are removed (or
//! duplicated) one at a time; every removal is recorded, so going back
//! to any size already visited costs nothing.
//!
//! ```no_run
//! use liquidseam::{imageio, Carver};
//!
//! let pixels = imageio::open("castle.png")?;
//! let mut carver = Carver::new(pixels)?;
//! carver.resize(400, 300)?;
//! imageio::save(&carver.image()?, "castle-small.png")?;
//! # Ok::<(), liquidseam::Error>(())
//! ```

mod ternary;

mod carverlist;
mod costmaps;
mod energymap;
mod rigidity;
mod seamfinder;
mod twodmap;

pub mod carver;
pub mod energy;
pub mod error;
pub mod imageio;
pub mod pixels;
pub mod progress;
pub mod state;
pub mod visibility;
pub mod window;

pub use carver::{Carver, ResizeOrder, ResizeOutcome};
pub use carverlist::AttachedId;
pub use energy::{BuiltinEnergy, EnergyFunction};
pub use error::{Error, Result};
pub use pixels::{ColorDepth, ImageKind, PixelBuffer, Sample, Samples};
pub use progress::ProgressSink;
pub use state::{CancelHandle, CarverState};
pub use visibility::{Orientation, VisibilityMap};
pub use window::{ReadKind, ReadingWindow};
