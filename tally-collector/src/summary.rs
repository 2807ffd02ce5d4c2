//! Election-wide summary
//!
//! A pure fold over the canonical constituency set. Party votes are summed from
//! candidate lines; candidates of parties outside the catalog count towards
//! "others".

use std::collections::HashMap;

use tally_common::catalog::{find_party, OTHERS_PARTY_ID, PARTIES, TOTAL_SEATS};
use tally_common::models::{
    CollectionPhase, ConstituencyRecord, ConstituencyStatus, ElectionSummary, PartyStanding,
};
use tally_common::time::now_millis;

#[derive(Default)]
struct Tally {
    won: u32,
    leading: u32,
    votes: u64,
}

fn catalog_party(party_id: &str) -> &str {
    let normalized = party_id.trim();
    match find_party(normalized) {
        Some(party) => party.id,
        None => OTHERS_PARTY_ID,
    }
}

/// Recompute the summary from every canonical record
pub fn aggregate(records: &[ConstituencyRecord], phase: CollectionPhase) -> ElectionSummary {
    let mut tallies: HashMap<&str, Tally> = PARTIES.iter().map(|p| (p.id, Tally::default())).collect();

    let mut seats_declared = 0u32;
    let mut total_votes = 0u64;
    let mut turnout_sum = 0.0;
    let mut turnout_count = 0u32;

    for record in records {
        if record.status.is_terminal() {
            seats_declared += 1;
            if let Some(winner) = record.candidates.iter().find(|c| c.is_winner) {
                if let Some(tally) = tallies.get_mut(catalog_party(&winner.party_id)) {
                    tally.won += 1;
                }
            }
        } else if record.status == ConstituencyStatus::Counting {
            if let Some(leader) = record.candidates.iter().find(|c| c.is_leading) {
                if let Some(tally) = tallies.get_mut(catalog_party(&leader.party_id)) {
                    tally.leading += 1;
                }
            }
        }

        for candidate in &record.candidates {
            if let Some(tally) = tallies.get_mut(catalog_party(&candidate.party_id)) {
                tally.votes += candidate.votes;
            }
            total_votes += candidate.votes;
        }

        if record.turnout_percent > 0.0 {
            turnout_sum += record.turnout_percent;
            turnout_count += 1;
        }
    }

    let parties: Vec<PartyStanding> = PARTIES
        .iter()
        .map(|p| {
            let tally = tallies.remove(p.id).unwrap_or_default();
            PartyStanding {
                id: p.id.to_string(),
                name: p.name.to_string(),
                short_name: p.short_name.to_string(),
                seats_won: tally.won,
                seats_leading: tally.leading,
                total_votes: tally.votes,
            }
        })
        .collect();

    // Strictly greater keeps the first party in catalog order on ties
    let leading_party = parties
        .iter()
        .fold(None::<&PartyStanding>, |best, p| {
            let seats = p.seats_won + p.seats_leading;
            match best {
                Some(b) if b.seats_won + b.seats_leading >= seats => Some(b),
                _ if seats > 0 => Some(p),
                _ => best,
            }
        })
        .map(|p| p.id.clone());

    let total_seats = TOTAL_SEATS.max(records.len() as u32);
    ElectionSummary {
        total_seats,
        seats_declared,
        seats_remaining: total_seats.saturating_sub(seats_declared),
        total_votes_counted: total_votes,
        avg_turnout: if turnout_count > 0 {
            (turnout_sum / turnout_count as f64).round()
        } else {
            0.0
        },
        parties,
        leading_party,
        phase,
        last_updated: now_millis(),
    }
}
