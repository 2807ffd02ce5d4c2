//! Static election catalog
//!
//! Party list in its fixed display order (also the leading-party tie break)
//! and the 300-seat constituency seed list generated from the district seat
//! table.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{ConstituencyRecord, ConstituencyStatus};

/// Number of seats contested
pub const TOTAL_SEATS: u32 = 300;

/// Average registered voters per seat
pub const AVG_REGISTERED: u64 = 425_333;

/// Seat whose poll was postponed before election day
pub const POSTPONED_SEAT: &str = "Sherpur-3";

/// Party id that collects candidates from parties outside the catalog
pub const OTHERS_PARTY_ID: &str = "others";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartyInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub short_name: &'static str,
}

const fn party(id: &'static str, name: &'static str, short_name: &'static str) -> PartyInfo {
    PartyInfo { id, name, short_name }
}

/// Parties in stable display order
pub const PARTIES: &[PartyInfo] = &[
    party("bnp", "Bangladesh Nationalist Party", "BNP"),
    party("jamaat", "Bangladesh Jamaat-e-Islami", "Jamaat"),
    party("ncp", "National Citizen Party", "NCP"),
    party("islami-andolan", "Islami Andolan Bangladesh", "IAB"),
    party("jp-ershad", "Jatiya Party", "JP"),
    party("gonoforum", "Gono Forum", "GF"),
    party("ldp", "Liberal Democratic Party", "LDP"),
    party("jasod", "Jatiya Samajtantrik Dal", "JSD"),
    party("workers-party", "Workers Party of Bangladesh", "WPB"),
    party("independent", "Independent", "IND"),
    party(OTHERS_PARTY_ID, "Others", "OTH"),
];

pub fn find_party(id: &str) -> Option<&'static PartyInfo> {
    PARTIES.iter().find(|p| p.id == id)
}

/// Seats per district, grouped by division
const DISTRICT_SEATS: &[(&str, &[(&str, u32)])] = &[
    (
        "Dhaka",
        &[
            ("Dhaka", 20),
            ("Tangail", 8),
            ("Gazipur", 5),
            ("Kishoreganj", 6),
            ("Narsingdi", 5),
            ("Narayanganj", 5),
            ("Faridpur", 4),
            ("Gopalganj", 3),
            ("Manikganj", 3),
            ("Munshiganj", 3),
            ("Madaripur", 3),
            ("Shariatpur", 3),
            ("Rajbari", 2),
        ],
    ),
    (
        "Chattogram",
        &[
            ("Chattogram", 16),
            ("Cumilla", 11),
            ("Brahmanbaria", 6),
            ("Chandpur", 6),
            ("Noakhali", 5),
            ("Cox's Bazar", 4),
            ("Feni", 3),
            ("Lakshmipur", 3),
            ("Khagrachhari", 2),
            ("Rangamati", 1),
            ("Bandarban", 1),
        ],
    ),
    (
        "Rajshahi",
        &[
            ("Bogura", 7),
            ("Rajshahi", 6),
            ("Naogaon", 6),
            ("Sirajganj", 6),
            ("Pabna", 5),
            ("Natore", 3),
            ("Chapainawabganj", 3),
            ("Joypurhat", 3),
        ],
    ),
    (
        "Khulna",
        &[
            ("Kushtia", 6),
            ("Jashore", 6),
            ("Khulna", 6),
            ("Satkhira", 4),
            ("Jhenaidah", 4),
            ("Chuadanga", 2),
            ("Magura", 2),
            ("Narail", 2),
            ("Meherpur", 2),
            ("Bagerhat", 2),
        ],
    ),
    (
        "Rangpur",
        &[
            ("Rangpur", 6),
            ("Dinajpur", 6),
            ("Gaibandha", 5),
            ("Kurigram", 4),
            ("Nilphamari", 4),
            ("Thakurgaon", 3),
            ("Lalmonirhat", 3),
            ("Panchagarh", 2),
        ],
    ),
    (
        "Mymensingh",
        &[("Mymensingh", 11), ("Jamalpur", 5), ("Netrokona", 5), ("Sherpur", 3)],
    ),
    (
        "Barishal",
        &[
            ("Barishal", 6),
            ("Bhola", 4),
            ("Patuakhali", 4),
            ("Pirojpur", 3),
            ("Barguna", 2),
            ("Jhalokathi", 2),
        ],
    ),
    (
        "Sylhet",
        &[("Sylhet", 6), ("Sunamganj", 5), ("Habiganj", 4), ("Moulvibazar", 4)],
    ),
];

/// Division names in catalog order
pub fn divisions() -> impl Iterator<Item = &'static str> {
    DISTRICT_SEATS.iter().map(|(division, _)| *division)
}

/// Canonical seed records with zeroed counts
///
/// Registered voters vary deterministically within ±20% of the average so
/// re-seeding always produces identical records.
pub fn seed_constituencies() -> Vec<ConstituencyRecord> {
    let mut records = Vec::with_capacity(TOTAL_SEATS as usize);
    let mut number = 1u32;

    for (division, districts) in DISTRICT_SEATS {
        for (district, seats) in *districts {
            for seat in 1..=*seats {
                let name = format!("{}-{}", district, seat);
                let id = name.to_lowercase().replace(['\'', ' '], "-");
                let status = if name == POSTPONED_SEAT {
                    ConstituencyStatus::Postponed
                } else {
                    ConstituencyStatus::NotStarted
                };

                records.push(ConstituencyRecord {
                    id,
                    number,
                    name,
                    division: division.to_string(),
                    district: district.to_string(),
                    candidates: Vec::new(),
                    status,
                    total_votes: 0,
                    total_registered: registered_voters(number),
                    turnout_percent: 0.0,
                    win_margin: 0,
                    trust_score: 0,
                    source: String::new(),
                    last_updated: 0,
                });
                number += 1;
            }
        }
    }

    records
}

fn registered_voters(number: u32) -> u64 {
    let spread = ((number as u64 * 7919) % 401) as f64 / 1000.0;
    (AVG_REGISTERED as f64 * (0.8 + spread)).round() as u64
}

/// Default polling-open instant (07:30 local)
pub fn default_voting_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 12, 1, 30, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Default polling-close instant (16:30 local)
pub fn default_voting_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 12, 10, 30, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
