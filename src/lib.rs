//! BinduAlign - Pairwise alignment of 3D point sets.
//!
//! Given two point sets with per-point normals and initial rigid placements,
//! the engine iteratively refines the placement of the second set so that it
//! best aligns with the first under a chosen transformation class:
//! translation-only, rigid, similarity (rigid + uniform scale), or affine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   matching/                         │  ← Alignment engine
//! │   (grid, matcher, reject, solver, controller)       │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌──────────────────────────┬──────────────────────────┐
//! │        sampling/         │         spatial/         │  ← Sampling + search
//! │   (weighted CDF draws)   │  (k-d tree, normals)     │
//! └──────────────────────────┴──────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Algorithm
//!
//! Each iteration draws a weighted sample of vertices from both sets, matches
//! them bidirectionally through k-d trees (with optional normal-compatibility
//! gating), prunes outliers against median-based adaptive thresholds, and
//! solves a symmetric point-to-plane least-squares system with Huber-weighted
//! IRLS regularization. Every tenth iteration the per-vertex sampling
//! distribution is refreshed from the eigenstructure of the most recent solve
//! so that poorly constrained directions are sampled more densely.
//!
//! # Example
//!
//! ```no_run
//! use bindu_align::{AlignConfig, PointSet, align};
//! use nalgebra::Matrix4;
//!
//! let set1 = PointSet::new(vec![]);
//! let set2 = PointSet::new(vec![]);
//! let xf1 = Matrix4::identity();
//! let mut xf2 = Matrix4::identity();
//!
//! let rms = align(&set1, &set2, &xf1, &mut xf2, &AlignConfig::default())?;
//! println!("aligned with RMS residual {rms:.6}");
//! # Ok::<(), bindu_align::AlignError>(())
//! ```

pub mod core;
pub mod matching;
pub mod sampling;
pub mod spatial;
pub mod utils;

// Convenience re-exports (flat namespace for common use)
pub use core::math;
pub use core::types::{PointPair, PointSet};
pub use matching::{
    AlignConfig, AlignError, AlignResult, XformType, align, align_weighted, align_with_trees,
    evaluate,
};
pub use sampling::Cdf;
pub use spatial::VertexTree;
