//! Static reference content shown on the citizen dashboard.

use serde::Serialize;

/// An emergency service hotline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmergencyContact {
    pub name: &'static str,
    pub number: &'static str,
}

/// Preparedness advice for one kind of disaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyTips {
    pub disaster_type: &'static str,
    pub tips: &'static [&'static str],
}

pub const EMERGENCY_CONTACTS: &[EmergencyContact] = &[
    EmergencyContact {
        name: "Police",
        number: "100",
    },
    EmergencyContact {
        name: "Fire",
        number: "101",
    },
    EmergencyContact {
        name: "Ambulance",
        number: "102",
    },
];

pub const SAFETY_TIPS: &[SafetyTips] = &[
    SafetyTips {
        disaster_type: "Flood",
        tips: &[
            "Move to higher ground immediately",
            "Avoid walking or driving through flood waters",
            "Turn off utilities if instructed to do so",
        ],
    },
    SafetyTips {
        disaster_type: "Fire",
        tips: &[
            "Evacuate immediately if threatened",
            "Stay low to avoid smoke inhalation",
            "Call emergency services from a safe location",
        ],
    },
    SafetyTips {
        disaster_type: "Earthquake",
        tips: &[
            "Drop, Cover, and Hold On",
            "Stay away from windows and heavy objects",
            "Exit building after shaking stops if safe",
        ],
    },
    SafetyTips {
        disaster_type: "Cyclone",
        tips: &[
            "Secure outdoor items and close shutters",
            "Stay indoors away from windows",
            "Have emergency supplies ready",
        ],
    },
];
