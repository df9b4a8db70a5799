use serde::Serialize;

use crate::workflows::patents::domain::Grade;

pub const ORIGINALITY_WEIGHT: f64 = 0.55;
pub const MARKET_WEIGHT: f64 = 0.45;

/// Lower edge of each grade band; D covers everything below C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeBand {
    pub grade: Grade,
    pub lower: f64,
}

pub const GRADE_BANDS: [GradeBand; 5] = [
    GradeBand {
        grade: Grade::S,
        lower: 0.85,
    },
    GradeBand {
        grade: Grade::A,
        lower: 0.70,
    },
    GradeBand {
        grade: Grade::B,
        lower: 0.55,
    },
    GradeBand {
        grade: Grade::C,
        lower: 0.40,
    },
    GradeBand {
        grade: Grade::D,
        lower: 0.0,
    },
];
