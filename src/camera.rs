use crate::image::Image;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum CaptureError {
    #[error("no frames left to capture")]
    Exhausted,
    #[error("no run of at least {min_group_size} consecutive frames")]
    NoUsableGroup { min_group_size: usize },
    #[error("expected group index below {available} but got: {index}")]
    GroupOutOfRange { index: usize, available: usize },
}

/// Anything that can take photographs.
///
/// The pipeline never depends on whether the source is real hardware, a
/// recording or a simulation.
pub trait Camera {
    fn capture(&mut self) -> Result<Image, CaptureError>;
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn capture(&mut self) -> Result<Image, CaptureError> {
        (**self).capture()
    }
}

/// Chooses which run of consecutive frames a [`ReplayCamera`] plays back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GroupSelection {
    Index(usize),

    /// Picks a run at random with a seeded generator.
    Random(u64),
}

/// Plays back previously recorded frames as if they were being captured.
#[derive(Clone, Debug)]
pub struct ReplayCamera {
    frames: VecDeque<Image>,
}

impl ReplayCamera {
    /// Splits `frames` into runs of consecutive identifiers, keeps the runs
    /// with at least `min_group_size` frames and replays the selected one.
    pub fn new(
        frames: Vec<Image>,
        min_group_size: usize,
        selection: GroupSelection,
    ) -> Result<Self, CaptureError> {
        let mut groups = Self::groups(frames, min_group_size);
        if groups.is_empty() {
            return Err(CaptureError::NoUsableGroup { min_group_size });
        }

        let index = match selection {
            GroupSelection::Index(index) => index,
            GroupSelection::Random(seed) => StdRng::seed_from_u64(seed).random_range(0..groups.len()),
        };

        if index >= groups.len() {
            return Err(CaptureError::GroupOutOfRange {
                index,
                available: groups.len(),
            });
        }

        let group = groups.swap_remove(index);
        info!(
            group = index,
            frames = group.len(),
            first = group.first().map(Image::id),
            "replaying recorded frames"
        );

        Ok(Self {
            frames: group.into(),
        })
    }

    /// Runs of frames with consecutive identifiers, in identifier order.
    pub fn groups(mut frames: Vec<Image>, min_group_size: usize) -> Vec<Vec<Image>> {
        frames.sort_by_key(Image::id);

        let mut groups: Vec<Vec<Image>> = Vec::new();
        for frame in frames {
            match groups.last_mut() {
                Some(group)
                    if group
                        .last()
                        .is_some_and(|last| last.id().checked_add(1) == Some(frame.id())) =>
                {
                    group.push(frame)
                }
                _ => groups.push(vec![frame]),
            }
        }

        groups.retain(|group| group.len() >= min_group_size);
        groups
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Camera for ReplayCamera {
    fn capture(&mut self) -> Result<Image, CaptureError> {
        self.frames.pop_front().ok_or(CaptureError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use rstest::rstest;

    fn frames(ids: &[u64]) -> Vec<Image> {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 19, 10, 0, 0).unwrap();
        ids.iter()
            .map(|id| Image::new(*id, t0 + TimeDelta::seconds(*id as i64 * 10), 4056, 3040))
            .collect()
    }

    fn ids(group: &[Image]) -> Vec<u64> {
        group.iter().map(Image::id).collect()
    }

    #[test]
    fn groups_consecutive_identifiers() {
        let groups = ReplayCamera::groups(frames(&[7, 1, 2, 3, 10, 11, 8, 20]), 2);
        let groups: Vec<Vec<u64>> = groups.iter().map(|g| ids(g)).collect();
        assert_eq!(groups, vec![vec![1, 2, 3], vec![7, 8], vec![10, 11]]);
    }

    #[test]
    fn groups_up_to_largest_identifier() {
        let groups = ReplayCamera::groups(frames(&[0, u64::MAX - 1, u64::MAX]), 1);
        let groups: Vec<Vec<u64>> = groups.iter().map(|g| ids(g)).collect();
        assert_eq!(groups, vec![vec![0], vec![u64::MAX - 1, u64::MAX]]);
    }

    #[test]
    fn replays_selected_group_in_order() {
        let mut camera =
            ReplayCamera::new(frames(&[1, 2, 3, 10, 11, 12, 13]), 3, GroupSelection::Index(1))
                .unwrap();

        assert_eq!(camera.remaining(), 4);
        for expected in 10..=13 {
            assert_eq!(camera.capture().unwrap().id(), expected);
        }
        assert_eq!(camera.capture().unwrap_err(), CaptureError::Exhausted);
    }

    #[test]
    fn random_selection_is_seeded() {
        let pick = |seed| {
            ReplayCamera::new(frames(&[1, 2, 3, 10, 11, 12, 20, 21, 22]), 3, GroupSelection::Random(seed))
                .unwrap()
                .capture()
                .unwrap()
                .id()
        };
        assert_eq!(pick(42), pick(42));
    }

    #[rstest]
    #[case(&[1, 3, 5], 2, GroupSelection::Index(0), CaptureError::NoUsableGroup { min_group_size: 2 })]
    #[case(&[1, 2, 3], 3, GroupSelection::Index(1), CaptureError::GroupOutOfRange { index: 1, available: 1 })]
    fn invalid_replay(
        #[case] ids: &[u64],
        #[case] min_group_size: usize,
        #[case] selection: GroupSelection,
        #[case] expected: CaptureError,
    ) {
        assert_eq!(
            ReplayCamera::new(frames(ids), min_group_size, selection).unwrap_err(),
            expected
        );
    }
}
