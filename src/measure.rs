use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

macro_rules! measurements {
    { $( $variant:ident => $name:literal, $token:literal; )+ } => {
        /// Automatic measurement items of the scope, as accepted by `:MEASure:ITEM?`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Measurement {
            $( $variant, )+
        }

        impl Measurement {
            pub const ALL: &'static [Measurement] = &[ $( Measurement::$variant, )+ ];

            /// Canonical human readable name, e.g. `RISE TIME`.
            pub fn name(self) -> &'static str {
                match self { $( Measurement::$variant => $name, )+ }
            }

            /// Protocol token in SCPI long form, e.g. `RTIMe`.
            pub fn token(self) -> &'static str {
                match self { $( Measurement::$variant => $token, )+ }
            }
        }
    }
}

measurements! {
    VMax          => "VMAX",      "VMAX";
    VMin          => "VMIN",      "VMIN";
    Vpp           => "VPP",       "VPP";
    VTop          => "VTOP",      "VTOP";
    VBase         => "VBASE",     "VBASe";
    VAmp          => "VAMP",      "VAMP";
    VAvg          => "VAVG",      "VAVG";
    VRms          => "VRMS",      "VRMS";
    Overshoot     => "OVERSHOOT", "OVERshoot";
    Preshoot      => "PRESHOOT",  "PREShoot";
    Area          => "AREA",      "MARea";
    PeriodArea    => "PER AREA",  "MPARea";
    Period        => "PERIOD",    "PERiod";
    Frequency     => "FREQUENCY", "FREQuency";
    RiseTime      => "RISE TIME", "RTIMe";
    FallTime      => "FALL TIME", "FTIMe";
    PositiveWidth => "+WIDTH",    "PWIDth";
    NegativeWidth => "-WIDTH",    "NWIDth";
    PositiveDuty  => "+DUTY",     "PDUTy";
    NegativeDuty  => "-DUTY",     "NDUTy";
    RiseDelay     => "RDELAY",    "RDELay";
    FallDelay     => "FDELAY",    "FDELay";
    RisePhase     => "RPHASE",    "RPHase";
    FallPhase     => "FPHASE",    "FPHase";
    TimeAtMax     => "TVMAX",     "TVMAX";
    TimeAtMin     => "TVMIN",     "TVMIN";
    PositiveSlew  => "+RATE",     "PSLEWrate";
    NegativeSlew  => "-RATE",     "NSLEWrate";
    VUpper        => "VUPPER",    "VUPper";
    VMid          => "VMID",      "VMID";
    VLower        => "VLOWER",    "VLOWer";
    Variance      => "VARIANCE",  "VARIance";
    PeriodVRms    => "PER VRMS",  "PVRMS";
    PositivePulses => "+PULSES",  "PPULses";
    NegativePulses => "-PULSES",  "NPULses";
    PositiveEdges => "+EDGES",    "PEDGes";
    NegativeEdges => "-EDGES",    "NEDGes";
}

impl Measurement {
    /// Protocol token in SCPI short form: its leading upper case part, e.g. `RTIM`.
    pub fn short_token(self) -> &'static str {
        let token = self.token();
        let len = token.find(|c: char| c.is_ascii_lowercase()).unwrap_or(token.len());
        &token[..len]
    }

    /// Look up a measurement by canonical name, long token or short token, ignoring case.
    pub fn resolve(name: &str) -> Result<Measurement> {
        let wanted = name.trim();
        Measurement::ALL.iter().copied()
            .find(|item| {
                item.name().eq_ignore_ascii_case(wanted) ||
                    item.token().eq_ignore_ascii_case(wanted) ||
                    item.short_token().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| Error::UnknownMeasurement(name.to_owned()))
    }
}

impl FromStr for Measurement {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Measurement::resolve(name)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
