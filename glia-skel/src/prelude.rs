//! 常用导出的一站式引入.
//!
//! ```
//! use glia_skel::prelude::*;
//! ```

pub use crate::msfm::{msfm2d, msfm2d_skel};
pub use crate::raytracing::{make_stepper, Stepper, StepperType};
pub use crate::shortest_path::{ShortestPath, Trace};
pub use crate::skeleton::Skeletonizer;
pub use crate::{Idx2d, Idx2dF, Polyline, SkelError};
