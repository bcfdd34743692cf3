//! Roster changes on zones that are already in play.
//!
//! Every change follows the same shape: drop the zone's pending matches,
//! rebuild the template from the new membership around the matches that were
//! already decided, then book whatever is left unscheduled. Decided matches
//! keep their entrants, score and booking; if the new template has no place
//! for them the change is rejected.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{TournamentError, TournamentResult};
use crate::schedule::{CourtScheduler, schedule_matches};
use crate::tournament::models::{CategoryState, EntrantId, TournamentConfig};
use crate::zone::models::{MatchKind, Zone, ZoneFormat, ZoneId, ZoneMatch};
use crate::zone::template::{build_matches, drafts_for, propagate, round_robin_pairs};

/// Destination for an entrant displaced by a restructure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub entrant_id: EntrantId,
    pub zone_id: ZoneId,
}

/// Recovery policy when an entrant leaves a 3-entrant zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum WithdrawPolicy {
    /// The two remaining entrants play a single decisive match
    FinalOnly,
    /// Move the remaining entrants to other zones
    Restructure { destinations: Vec<Relocation> },
    /// Take an entrant from a full zone so both zones play with three
    Rebalance,
}

impl WithdrawPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawPolicy::FinalOnly => "final_only",
            WithdrawPolicy::Restructure { .. } => "restructure",
            WithdrawPolicy::Rebalance => "rebalance",
        }
    }
}

/// Book every unscheduled match around the bookings already in the category
pub fn reschedule(state: &mut CategoryState, config: &TournamentConfig) -> TournamentResult<()> {
    let mut scheduler = CourtScheduler::for_config(config);
    let zones: Vec<&Zone> = state.zones.iter().collect();
    schedule_matches(&mut scheduler, &zones, &mut state.matches, &state.entrants)
}

/// `members` reordered so `lead` comes first, rest in their original order
fn lead_with(members: &[EntrantId], lead: &[EntrantId]) -> Vec<EntrantId> {
    lead.iter()
        .copied()
        .chain(members.iter().copied().filter(|id| !lead.contains(id)))
        .collect()
}

fn fit_template(
    zone_id: ZoneId,
    format: ZoneFormat,
    members: &[EntrantId],
    mut finalized: Vec<ZoneMatch>,
) -> TournamentResult<(Vec<EntrantId>, Vec<ZoneMatch>)> {
    let incompatible = |reason: String| TournamentError::IncompatibleResults {
        zone: zone_id,
        reason,
    };
    finalized.sort_by_key(|m| m.order);

    if finalized.is_empty() {
        let matches = build_matches(zone_id, drafts_for(format, members)?);
        return Ok((members.to_vec(), matches));
    }

    match (format, finalized.len()) {
        (ZoneFormat::RoundRobin, _) => {
            let played = |a: EntrantId, b: EntrantId| {
                finalized.iter().any(|m| m.involves(a) && m.involves(b))
            };
            let mut order = 0;
            let mut matches = Vec::new();
            for (a, b) in round_robin_pairs(members) {
                if played(a, b) {
                    continue;
                }
                order += 1;
                matches.push(ZoneMatch::new(zone_id, MatchKind::RoundRobin, order, Some(a), Some(b)));
            }
            // decided matches first, new pairs after
            let kept = finalized.len() as u32;
            for m in matches.iter_mut() {
                m.order += kept;
            }
            for (i, mut m) in finalized.into_iter().enumerate() {
                m.kind = MatchKind::RoundRobin;
                m.order = (i + 1) as u32;
                matches.push(m);
            }
            Ok((members.to_vec(), matches))
        }
        (ZoneFormat::Three, 1) | (ZoneFormat::FinalOnly, 1) | (ZoneFormat::Four, 1 | 2) => {
            let lead: Vec<EntrantId> = finalized
                .iter()
                .filter_map(|m| m.pairing())
                .flat_map(|(a, b)| [a, b])
                .collect();
            let mut distinct = lead.clone();
            distinct.sort_unstable();
            distinct.dedup();
            if distinct.len() != lead.len() {
                return Err(incompatible(
                    "decided matches share an entrant".to_string(),
                ));
            }

            let ordered = lead_with(members, &lead);
            let drafts = drafts_for(format, &ordered)?;
            let mut preserved = finalized.into_iter();
            let matches = drafts
                .into_iter()
                .map(|draft| match preserved.next() {
                    Some(mut m) => {
                        m.kind = draft.kind;
                        m.order = draft.order;
                        m
                    }
                    None => ZoneMatch::new(zone_id, draft.kind, draft.order, draft.slot1, draft.slot2),
                })
                .collect();
            Ok((ordered, matches))
        }
        (format, count) => Err(incompatible(format!(
            "{count} decided matches do not fit a {} template",
            format.as_str()
        ))),
    }
}

/// Rebuild a zone's template for a new membership
///
/// An empty membership deletes the zone. Decided matches are carried over
/// and may be relabelled to their place in the new template.
///
/// # Errors
///
/// Rejects a single remaining entrant, a membership over capacity, and any
/// template that cannot hold the zone's decided matches.
pub fn retemplate(
    state: &mut CategoryState,
    config: &TournamentConfig,
    zone_id: ZoneId,
    members: Vec<EntrantId>,
    format: ZoneFormat,
) -> TournamentResult<()> {
    state.open_zone(zone_id)?;
    let finalized: Vec<ZoneMatch> = state
        .zone_matches(zone_id)
        .into_iter()
        .filter(|m| m.is_finalized())
        .cloned()
        .collect();

    if members.is_empty() {
        if !finalized.is_empty() {
            return Err(TournamentError::IncompatibleResults {
                zone: zone_id,
                reason: "removing the zone would discard decided matches".to_string(),
            });
        }
        state.zones.retain(|z| z.id != zone_id);
        state.matches.retain(|m| m.zone_id != zone_id);
        info!("Zone {} removed from category {}", zone_id, state.key);
        return Ok(());
    }
    if members.len() == 1 {
        return Err(TournamentError::SingleEntrantZone(zone_id));
    }
    if members.len() > config.max_zone_size {
        return Err(TournamentError::ZoneCapacity {
            zone: zone_id,
            capacity: config.max_zone_size,
        });
    }
    if let Some(m) = finalized.iter().find(|m| {
        !m.pairing()
            .is_some_and(|(a, b)| members.contains(&a) && members.contains(&b))
    }) {
        return Err(TournamentError::IncompatibleResults {
            zone: zone_id,
            reason: format!("decided match {} involves an entrant leaving the zone", m.id),
        });
    }

    let (ordered, matches) = fit_template(zone_id, format, &members, finalized)?;

    state.matches.retain(|m| m.zone_id != zone_id);
    state.matches.extend(matches);
    let zone = state.zone_mut(zone_id)?;
    zone.members = ordered;
    zone.format = format;
    zone.tie_break = None;
    let name = zone.name.clone();

    propagate(&mut state.matches, zone_id);
    reschedule(state, config)?;
    info!("Zone {} re-templated as {}", name, format.as_str());
    Ok(())
}

/// Format a zone keeps after its membership changes to `size`
fn format_after_change(zone: &Zone, size: usize) -> ZoneFormat {
    if zone.format == ZoneFormat::RoundRobin && size >= 2 {
        ZoneFormat::RoundRobin
    } else {
        ZoneFormat::for_size(size)
    }
}

fn ensure_movable(state: &CategoryState, entrant_id: EntrantId, zone_id: ZoneId) -> TournamentResult<()> {
    let zone = state.open_zone(zone_id)?;
    if !zone.contains(entrant_id) {
        return Err(TournamentError::EntrantNotInZone {
            entrant: entrant_id,
            zone: zone_id,
        });
    }
    if state.has_finalized(entrant_id, zone_id) {
        return Err(TournamentError::FinalizedMatches {
            entrant: entrant_id,
            zone: zone_id,
        });
    }
    Ok(())
}

/// Rewrite entrant ids in a zone's pending matches, all pairs at once
fn rewrite_pending(matches: &mut [ZoneMatch], zone_id: ZoneId, mapping: &[(EntrantId, EntrantId)]) {
    for m in matches
        .iter_mut()
        .filter(|m| m.zone_id == zone_id && !m.is_finalized())
    {
        let mut touched = false;
        for slot in [&mut m.slot1, &mut m.slot2] {
            if let Some(id) = *slot
                && let Some(&(_, to)) = mapping.iter().find(|(from, _)| *from == id)
            {
                *slot = Some(to);
                touched = true;
            }
        }
        if touched {
            // partial scores belonged to the previous pairing
            m.score = None;
        }
    }
}

/// Move an entrant to another zone, or swap it with an entrant of `to_zone`
///
/// A same-zone request needs a swap partner and exchanges the two entrants'
/// places in the template.
///
/// # Errors
///
/// Rejected if either entrant has a decided match in its zone, if a zone is
/// closed, or if the destination is full.
pub fn move_entrant(
    state: &mut CategoryState,
    config: &TournamentConfig,
    entrant_id: EntrantId,
    from_zone: ZoneId,
    to_zone: ZoneId,
    swap_with: Option<EntrantId>,
) -> TournamentResult<()> {
    ensure_movable(state, entrant_id, from_zone)?;
    if let Some(partner) = swap_with {
        ensure_movable(state, partner, to_zone)?;
        if partner == entrant_id {
            return Err(TournamentError::InvalidRequest(
                "an entrant cannot be swapped with itself".to_string(),
            ));
        }
    } else {
        state.open_zone(to_zone)?;
    }

    match swap_with {
        Some(partner) if from_zone == to_zone => {
            let zone = state.zone_mut(from_zone)?;
            let a = zone.members.iter().position(|&id| id == entrant_id);
            let b = zone.members.iter().position(|&id| id == partner);
            if let (Some(a), Some(b)) = (a, b) {
                zone.members.swap(a, b);
            }
            rewrite_pending(
                &mut state.matches,
                from_zone,
                &[(entrant_id, partner), (partner, entrant_id)],
            );
            info!("Swapped entrants {} and {} within zone {}", entrant_id, partner, from_zone);
        }
        Some(partner) => {
            for (zone_id, leaving, arriving) in
                [(from_zone, entrant_id, partner), (to_zone, partner, entrant_id)]
            {
                let zone = state.zone_mut(zone_id)?;
                for member in zone.members.iter_mut() {
                    if *member == leaving {
                        *member = arriving;
                    }
                }
                rewrite_pending(&mut state.matches, zone_id, &[(leaving, arriving)]);
            }
            info!(
                "Swapped entrant {} (zone {}) with {} (zone {})",
                entrant_id, from_zone, partner, to_zone
            );
        }
        None if from_zone == to_zone => {
            return Err(TournamentError::InvalidRequest(
                "moving within the same zone needs a swap partner".to_string(),
            ));
        }
        None => {
            let source = state.zone(from_zone)?;
            let destination = state.zone(to_zone)?;
            if destination.size() + 1 > config.max_zone_size {
                return Err(TournamentError::ZoneCapacity {
                    zone: to_zone,
                    capacity: config.max_zone_size,
                });
            }

            let remaining: Vec<EntrantId> = source
                .members
                .iter()
                .copied()
                .filter(|&id| id != entrant_id)
                .collect();
            let source_format = format_after_change(source, remaining.len());
            let mut arrived = destination.members.clone();
            arrived.push(entrant_id);
            let destination_format = format_after_change(destination, arrived.len());

            retemplate(state, config, from_zone, remaining, source_format)?;
            retemplate(state, config, to_zone, arrived, destination_format)?;
            info!("Moved entrant {} from zone {} to zone {}", entrant_id, from_zone, to_zone);
        }
    }
    Ok(())
}

/// Take an entrant out of its zone and repair the zone
///
/// Round-robin zones and 4-entrant zones are re-templated directly. A
/// 3-entrant zone needs a `policy`.
///
/// # Errors
///
/// Rejected if the entrant has a decided match in the zone, if a 3-entrant
/// zone gets no policy, or if the chosen policy cannot be applied without
/// discarding decided results.
pub fn withdraw_entrant(
    state: &mut CategoryState,
    config: &TournamentConfig,
    entrant_id: EntrantId,
    zone_id: ZoneId,
    policy: Option<&WithdrawPolicy>,
) -> TournamentResult<()> {
    ensure_movable(state, entrant_id, zone_id)?;

    let zone = state.zone(zone_id)?;
    let remaining: Vec<EntrantId> = zone
        .members
        .iter()
        .copied()
        .filter(|&id| id != entrant_id)
        .collect();
    let format = zone.format;

    match (format, remaining.len()) {
        (_, 0 | 1) => return Err(TournamentError::SingleEntrantZone(zone_id)),
        (ZoneFormat::RoundRobin, _) => {
            retemplate(state, config, zone_id, remaining, ZoneFormat::RoundRobin)?;
        }
        (_, 3..) => {
            let next = ZoneFormat::for_size(remaining.len());
            retemplate(state, config, zone_id, remaining, next)?;
        }
        (_, 2) => {
            let policy = policy.ok_or(TournamentError::WithdrawPolicyRequired(zone_id))?;
            match policy {
                WithdrawPolicy::FinalOnly => {
                    if let Some(&played) = remaining.iter().find(|&&id| state.has_finalized(id, zone_id)) {
                        return Err(TournamentError::FinalizedMatches {
                            entrant: played,
                            zone: zone_id,
                        });
                    }
                    retemplate(state, config, zone_id, remaining, ZoneFormat::FinalOnly)?;
                }
                WithdrawPolicy::Restructure { destinations } => {
                    restructure(state, config, zone_id, &remaining, destinations)?;
                }
                WithdrawPolicy::Rebalance => {
                    *state = rebalance(state, config, zone_id, entrant_id, remaining)?;
                }
            }
            info!(
                "Entrant {} withdrawn from zone {} with policy {}",
                entrant_id,
                zone_id,
                policy.as_str()
            );
        }
    }

    state.entrants.retain(|e| e.id != entrant_id);
    Ok(())
}

fn restructure(
    state: &mut CategoryState,
    config: &TournamentConfig,
    zone_id: ZoneId,
    remaining: &[EntrantId],
    destinations: &[Relocation],
) -> TournamentResult<()> {
    let mut arrivals: BTreeMap<ZoneId, Vec<EntrantId>> = BTreeMap::new();
    let mut stayers = Vec::new();
    for &entrant in remaining {
        let target = destinations
            .iter()
            .find(|r| r.entrant_id == entrant)
            .ok_or(TournamentError::MissingDestination(entrant))?;
        if state.has_finalized(entrant, zone_id) {
            return Err(TournamentError::FinalizedMatches {
                entrant,
                zone: zone_id,
            });
        }
        if target.zone_id == zone_id {
            stayers.push(entrant);
        } else {
            state.open_zone(target.zone_id)?;
            arrivals.entry(target.zone_id).or_default().push(entrant);
        }
    }

    // vacate first so the destinations never see the entrants twice
    let vacated_format = ZoneFormat::for_size(stayers.len());
    retemplate(state, config, zone_id, stayers, vacated_format)?;

    for (destination, entrants) in arrivals {
        let zone = state.zone(destination)?;
        let mut members = zone.members.clone();
        members.extend(entrants);
        let format = format_after_change(zone, members.len());
        retemplate(state, config, destination, members, format)?;
    }
    Ok(())
}

/// Try every eligible donor entrant of every full zone, first fit wins
fn rebalance(
    state: &CategoryState,
    config: &TournamentConfig,
    zone_id: ZoneId,
    withdrawn: EntrantId,
    remaining: Vec<EntrantId>,
) -> TournamentResult<CategoryState> {
    let donors: Vec<&Zone> = state
        .zones_in_order()
        .into_iter()
        .filter(|z| z.id != zone_id && z.is_open() && z.size() == 4)
        .collect();

    for donor in donors {
        for &candidate in &donor.members {
            if state.has_finalized(candidate, donor.id) {
                continue;
            }

            let mut trial = state.clone();
            let left: Vec<EntrantId> = donor
                .members
                .iter()
                .copied()
                .filter(|&id| id != candidate)
                .collect();
            let mut joined = remaining.clone();
            joined.push(candidate);

            let attempt = retemplate(&mut trial, config, donor.id, left, ZoneFormat::Three)
                .and_then(|_| retemplate(&mut trial, config, zone_id, joined, ZoneFormat::Three));
            match attempt {
                Ok(()) => {
                    info!(
                        "Rebalanced zone {} after withdrawal of {}: entrant {} joins from zone {}",
                        zone_id, withdrawn, candidate, donor.name
                    );
                    return Ok(trial);
                }
                Err(e) => {
                    warn!("Donor {} from zone {} rejected: {}", candidate, donor.name, e);
                }
            }
        }
    }

    Err(TournamentError::NoDonorZone(zone_id))
}
