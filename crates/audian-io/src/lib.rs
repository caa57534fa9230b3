//! # Audian I/O
//!
//! Random-access sources of multichannel samples.
//!
//! A source has a fixed sample rate, frame count and channel count, and can be
//! read in arbitrary windows without loading the whole recording:
//!
//! - **WavSource**: out-of-core reader over a WAV file (seek + partial decode)
//! - **MemorySource**: planar in-memory data, cheap to clone
//! - **Region writer**: dump a contiguous [`SampleBuffer`] to a WAV file
//!
//! Reads are clamped to the valid frame range. Asking for frames entirely
//! before the start or after the end yields an empty buffer, never an error.
//!
//! ## Example
//!
//! ```rust
//! use audian_io::{MemorySource, RandomAccessSource};
//!
//! let left = vec![0.0f32; 1000];
//! let right = vec![0.5f32; 1000];
//! let mut source = MemorySource::new(1000.0, vec![left, right]).unwrap();
//!
//! let window = source.read_window(990, 100).unwrap();
//! assert_eq!(window.frames(), 10);
//! assert_eq!(window.get(0, 1), 0.5);
//! ```

pub mod error;
pub use error::{Error, Result};

mod buffer;
pub use buffer::SampleBuffer;

mod source;
pub use source::{clamp_range, RandomAccessSource, ReadStats};

mod memory;
pub use memory::MemorySource;

mod wav;
pub use wav::WavSource;

pub mod writer;
pub use writer::{write_wav, BitDepth};
