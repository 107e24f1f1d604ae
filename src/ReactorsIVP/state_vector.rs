//! Layout of the 33-entry digester state vector.
//!
//! | index | content |
//! |-------|---------|
//! | 0 | liquid volume |
//! | 1..=19 | substrates, canonical order |
//! | 20 | dead cells |
//! | 21..=28 | degraders |
//! | 29..=32 | cumulative gas: NH3, CH4, CO2, H2S |

pub const STATE_LEN: usize = 33;
/// Entries `1..=28` that are diluted by the feed.
pub const FEED_WIDTH: usize = 28;
/// Inoculum holds everything up to the degraders; gas accumulators start empty.
pub const INOCULUM_LEN: usize = 29;

pub const VOLUME: usize = 0;
pub const SUBSTRATES: std::ops::Range<usize> = 1..20;
pub const DEAD_CELLS: usize = 20;
pub const DEGRADERS: std::ops::Range<usize> = 21..29;
pub const GAS: std::ops::Range<usize> = 29..33;

pub const CARBO_IS: usize = 1;
pub const CARBO_IN: usize = 2;
pub const CARBON: usize = 3;
pub const LIPIDS: usize = 4;
pub const LCFA: usize = 5;
pub const PROT_IS: usize = 6;
pub const PROT_IN: usize = 7;
pub const AMINO: usize = 8;
pub const NH3: usize = 9;
pub const HAC: usize = 10;
pub const HPR: usize = 11;
pub const HBUT: usize = 12;
pub const HVAL: usize = 13;
pub const CH4: usize = 14;
pub const CO2: usize = 15;
pub const H2S: usize = 16;
pub const Z: usize = 17;
pub const H2PO4: usize = 18;
pub const A: usize = 19;

/// Dissolved gas species in the order of the gas accumulators.
pub const DISSOLVED_GASES: [usize; 4] = [NH3, CH4, CO2, H2S];

/// Column names of the state, index aligned with the state vector.
pub const STATE_HEADERS: [&str; STATE_LEN] = [
    "volume",
    "carb_ins",
    "carb_ine",
    "carb_sol",
    "lipids",
    "ac_lcfa",
    "prot_ins",
    "prot_ine",
    "amino",
    "dg_nh4",
    "ac_ace",
    "ac_prop",
    "ac_buty",
    "ac_val",
    "dg_ch4",
    "dg_co2",
    "dg_h2s",
    "io_z",
    "io_p",
    "io_a",
    "dead_cell",
    "degr_carb",
    "degr_amino",
    "degr_lipid",
    "degr_lcfa",
    "degr_hprop",
    "degr_butyr",
    "degr_valer",
    "degr_acet",
    "gf_nh3",
    "gf_ch4",
    "gf_co2",
    "gf_h2s",
];
