//! mpypack - CircuitPython bundle packer
//!
//! Converts the upstream zip-distributed CircuitPython library bundle into
//! flat mpylib containers plus a JSON manifest, for a consumer that can only
//! scan a linear byte stream.
//!
//! # Pipeline
//!
//! fetch release metadata → download bundle zip → extract into a temp
//! directory → pack every library under `lib/` → write `index.json`.
//!
//! # Container layout
//!
//! ```text
//! packages/{channel}/
//! ├── {library}.mpylib   # one per library: concatenated header+payload records
//! └── index.json         # {format, version, libs: [{name, deps, version}]}
//! ```

pub mod extract;
pub mod format;
pub mod index;
pub mod pack;
pub mod release;
