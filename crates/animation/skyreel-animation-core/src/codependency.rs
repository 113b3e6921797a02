//! Codependency groups: parameters whose samples must share the same frames.
//!
//! Membership is fixed once a group is built. Changing it means building a
//! new group and migrating samples into it ([`CodependencyGroup::migrate_from`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::AnimationContext;
use crate::error::{AnimationError, Result};
use crate::events::{Cause, EventBuffer};
use crate::parameter::{Parameter, ParameterKind, ParameterSet};
use crate::sample::ParameterValue;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodependencyGroup {
    members: Vec<ParameterKind>,
}

fn member<'a>(params: &'a ParameterSet, kind: ParameterKind) -> Result<&'a Parameter> {
    params.get(kind).ok_or_else(|| AnimationError::UnknownParameter {
        object: "codependency group".to_string(),
        kind: kind.tag().to_string(),
    })
}

impl CodependencyGroup {
    /// Duplicate kinds are collapsed; order of first appearance is kept.
    pub fn new(members: impl IntoIterator<Item = ParameterKind>) -> Self {
        let mut out: Vec<ParameterKind> = Vec::new();
        for k in members {
            if !out.contains(&k) {
                out.push(k);
            }
        }
        Self { members: out }
    }

    #[inline]
    pub fn members(&self) -> &[ParameterKind] {
        &self.members
    }

    #[inline]
    pub fn contains(&self, kind: ParameterKind) -> bool {
        self.members.contains(&kind)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Union of the members' sample frames.
    pub fn frames(&self, params: &ParameterSet) -> BTreeSet<i64> {
        self.members
            .iter()
            .filter_map(|&k| params.get(k))
            .flat_map(|p| p.frames())
            .collect()
    }

    /// What every member would hold at `frame` after an insert: the explicit
    /// value if given, else the existing sample, else a linear sample at the
    /// member's current value there.
    fn snapshot(
        &self,
        params: &ParameterSet,
        frame: i64,
        explicit: &[(ParameterKind, ParameterValue)],
        ctx: &AnimationContext,
    ) -> Result<Vec<(ParameterKind, ParameterValue, bool)>> {
        let mut out = Vec::with_capacity(self.members.len());
        for &kind in &self.members {
            let p = member(params, kind)?;
            let given = explicit
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, s)| s.at_frame(frame));
            let sample = match given {
                Some(s) => s,
                None => match p.sample_at(frame) {
                    Some(s) => *s,
                    None => ParameterValue::linear(frame, p.value_at(frame, ctx)),
                },
            };
            let unchanged = p.sample_at(frame) == Some(&sample);
            out.push((kind, sample, unchanged));
        }
        Ok(out)
    }

    /// Insert a keyframe at `frame` on every member. Members not named in
    /// `explicit` are snapshotted before anything is written, so filling them
    /// in leaves the evaluated result at `frame` unchanged. All members are
    /// validated before any is mutated.
    pub fn insert_keyframe(
        &self,
        params: &mut ParameterSet,
        frame: i64,
        explicit: &[(ParameterKind, ParameterValue)],
        ctx: &AnimationContext,
        cause: &Cause,
        events: &mut EventBuffer,
    ) -> Result<()> {
        if let Some((k, _)) = explicit.iter().find(|(k, _)| !self.contains(*k)) {
            return Err(AnimationError::UnknownParameter {
                object: "codependency group".to_string(),
                kind: k.tag().to_string(),
            });
        }
        let planned = self.snapshot(params, frame, explicit, ctx)?;
        for (kind, sample, _) in &planned {
            member(params, *kind)?.check_insert(sample)?;
        }
        self.write(params, planned, cause, events);
        Ok(())
    }

    /// Insert samples already validated against the final curve shape.
    pub(crate) fn insert_validated(
        &self,
        params: &mut ParameterSet,
        samples: &[(ParameterKind, ParameterValue)],
        cause: &Cause,
        events: &mut EventBuffer,
    ) {
        debug_assert_eq!(samples.len(), self.members.len());
        for (kind, sample) in samples {
            if let Some(p) = params.get_mut(*kind) {
                p.insert_checked(*sample, cause, events);
            }
        }
    }

    fn write(
        &self,
        params: &mut ParameterSet,
        planned: Vec<(ParameterKind, ParameterValue, bool)>,
        cause: &Cause,
        events: &mut EventBuffer,
    ) {
        for (kind, sample, unchanged) in planned {
            if unchanged {
                continue;
            }
            if let Some(p) = params.get_mut(kind) {
                p.insert_checked(sample, cause, events);
            }
        }
    }

    /// Remove `frame` from every member. Returns the removed samples.
    pub fn remove_keyframe(
        &self,
        params: &mut ParameterSet,
        frame: i64,
        cause: &Cause,
        events: &mut EventBuffer,
    ) -> Vec<(ParameterKind, ParameterValue)> {
        let mut removed = Vec::new();
        for &kind in &self.members {
            if let Some(p) = params.get_mut(kind) {
                if let Some(s) = p.remove_sample(frame, cause, events) {
                    removed.push((kind, s));
                }
            }
        }
        removed
    }

    /// Fails on the first member missing a frame some other member has.
    pub fn check_consistency(&self, params: &ParameterSet) -> Result<()> {
        let frames = self.frames(params);
        for &kind in &self.members {
            let p = member(params, kind)?;
            if let Some(&frame) = frames.iter().find(|&&f| !p.has_sample(f)) {
                return Err(AnimationError::CodependencyMismatch {
                    parameter: kind.tag().to_string(),
                    frame,
                });
            }
        }
        Ok(())
    }

    /// Fill in every missing member sample from the members' current curves.
    /// Raises no events; used when loading persisted data. Returns the number
    /// of samples synthesised.
    pub(crate) fn repair(&self, params: &mut ParameterSet, ctx: &AnimationContext) -> Result<usize> {
        let frames = self.frames(params);
        let mut missing = Vec::new();
        for &kind in &self.members {
            let p = member(params, kind)?;
            for &f in &frames {
                if !p.has_sample(f) {
                    missing.push((kind, ParameterValue::linear(f, p.value_at(f, ctx))));
                }
            }
        }
        let count = missing.len();
        let mut scratch = EventBuffer::default();
        for (kind, sample) in missing {
            if let Some(p) = params.get_mut(kind) {
                p.insert_checked(sample, &None, &mut scratch);
            }
        }
        if count > 0 {
            for &kind in &self.members {
                if let Some(p) = params.get_mut(kind) {
                    p.clamp_handles();
                }
            }
        }
        Ok(count)
    }

    /// Bring `params` in line with this group after it replaces `old`: every
    /// frame the old group keyed gets a sample on every member of this one.
    /// Values are snapshotted across all frames before any insertion.
    pub fn migrate_from(
        &self,
        old: &CodependencyGroup,
        params: &mut ParameterSet,
        ctx: &AnimationContext,
        cause: &Cause,
        events: &mut EventBuffer,
    ) -> Result<()> {
        let frames = old.frames(params);
        let mut planned = Vec::new();
        for &f in &frames {
            planned.extend(self.snapshot(params, f, &[], ctx)?);
        }
        for (kind, sample, unchanged) in &planned {
            if !unchanged {
                member(params, *kind)?.check_insert(sample)?;
            }
        }
        log::debug!(
            "codependency group replaced: {} -> {} members over {} frames",
            old.len(),
            self.len(),
            frames.len()
        );
        self.write(params, planned, cause, events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AnimatableId;

    fn pair() -> (ParameterSet, CodependencyGroup) {
        let owner = AnimatableId::new();
        let kinds = [ParameterKind::EyeLat, ParameterKind::EyeLon];
        (ParameterSet::with_kinds(owner, &kinds), CodependencyGroup::new(kinds))
    }

    #[test]
    fn duplicate_members_collapse() {
        let g = CodependencyGroup::new([ParameterKind::Roll, ParameterKind::Roll]);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn snapshot_fills_companion_from_prior_curve() {
        let (mut params, group) = pair();
        let ctx = AnimationContext::default();
        let mut ev = EventBuffer::default();
        group
            .insert_keyframe(
                &mut params,
                0,
                &[
                    (ParameterKind::EyeLat, ParameterValue::linear(0, 0.0)),
                    (ParameterKind::EyeLon, ParameterValue::linear(0, 0.0)),
                ],
                &ctx,
                &None,
                &mut ev,
            )
            .unwrap();
        group
            .insert_keyframe(
                &mut params,
                20,
                &[
                    (ParameterKind::EyeLat, ParameterValue::linear(20, 10.0)),
                    (ParameterKind::EyeLon, ParameterValue::linear(20, 40.0)),
                ],
                &ctx,
                &None,
                &mut ev,
            )
            .unwrap();
        let before = params.get(ParameterKind::EyeLon).unwrap().value_at(10, &ctx);
        group
            .insert_keyframe(
                &mut params,
                10,
                &[(ParameterKind::EyeLat, ParameterValue::linear(10, 5.0))],
                &ctx,
                &None,
                &mut ev,
            )
            .unwrap();
        let lon = params.get(ParameterKind::EyeLon).unwrap();
        assert_eq!(lon.sample_at(10).map(|s| s.value), Some(before));
        group.check_consistency(&params).unwrap();
    }

    #[test]
    fn failed_validation_leaves_members_untouched() {
        let (mut params, group) = pair();
        let ctx = AnimationContext::default();
        let mut ev = EventBuffer::default();
        let bad = ParameterValue::bezier(
            5,
            1.0,
            Some(crate::sample::Handle::new(2.0, 0.0)),
            None,
        );
        let err = group
            .insert_keyframe(&mut params, 5, &[(ParameterKind::EyeLon, bad)], &ctx, &None, &mut ev)
            .unwrap_err();
        assert!(matches!(err, AnimationError::InvalidBezierHandle { .. }));
        assert!(params.iter().all(|p| p.samples().is_empty()));
        assert!(ev.is_empty());
    }

    #[test]
    fn consistency_reports_missing_member() {
        let (mut params, group) = pair();
        let mut ev = EventBuffer::default();
        params
            .get_mut(ParameterKind::EyeLat)
            .unwrap()
            .insert_sample(ParameterValue::linear(7, 1.0), &None, &mut ev)
            .unwrap();
        let err = group.check_consistency(&params).unwrap_err();
        assert_eq!(
            err,
            AnimationError::CodependencyMismatch {
                parameter: "eyeLon".into(),
                frame: 7
            }
        );
        assert_eq!(group.repair(&mut params, &AnimationContext::default()).unwrap(), 1);
        group.check_consistency(&params).unwrap();
    }
}
