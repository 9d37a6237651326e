//! Init levels.

use std::fmt;
use std::str::FromStr;

/// Coarse initialization bucket. Declaration order is rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Before anything else, rank 0.
    Early,
    /// Before the kernel, no kernel services, rank 1.
    PreKernel1,
    /// Before the kernel, basic services available, rank 2.
    PreKernel2,
    /// After the kernel starts, rank 3.
    PostKernel,
    /// Application level, rank 4.
    Application,
    /// After secondary CPUs start, rank 5.
    Smp,
    /// Initialized on request only, rank 6.
    Manual,
}

impl Level {
    /// Every level, lowest rank first.
    pub const ALL: [Self; 7] = [
        Self::Early,
        Self::PreKernel1,
        Self::PreKernel2,
        Self::PostKernel,
        Self::Application,
        Self::Smp,
        Self::Manual,
    ];

    /// Fixed rank, 0 for `EARLY` up to 6 for `MANUAL`.
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Marker name as used in overlays and emitted macros.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Early => "EARLY",
            Self::PreKernel1 => "PRE_KERNEL_1",
            Self::PreKernel2 => "PRE_KERNEL_2",
            Self::PostKernel => "POST_KERNEL",
            Self::Application => "APPLICATION",
            Self::Smp => "SMP",
            Self::Manual => "MANUAL",
        }
    }

    /// The level this one depends on (`EARLY` has none).
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Early => None,
            Self::PreKernel1 => Some(Self::Early),
            Self::PreKernel2 => Some(Self::PreKernel1),
            Self::PostKernel => Some(Self::PreKernel2),
            Self::Application => Some(Self::PostKernel),
            Self::Smp => Some(Self::Application),
            Self::Manual => Some(Self::Smp),
        }
    }

    /// Looks a marker up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.name() == name)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned by [`Level::from_str`] for an unknown marker name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown init level '{}'", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownLevel(s.to_string()))
    }
}
