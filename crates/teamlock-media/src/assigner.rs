//! Frame loop tying calibration, classification and stabilization together.
//!
//! Frame 0 is the reference frame: detections from every role category are
//! pooled to fit the team model once. Every frame, frame 0 included, is then
//! classified detection by detection and the stabilized team id and display
//! color are written back onto the tracker's records.

use image::RgbImage;
use serde::Serialize;
use teamlock_models::{FrameTracks, TeamId, Tracks};
use tracing::{info, warn};

use crate::calibration::{ClusterModel, ClusterModelBuilder};
use crate::classifier::TeamClassifier;
use crate::clustering::{ColorClusterer, KMeans};
use crate::config::TeamAssignConfig;
use crate::diagnostics::{DiagnosticsSink, NoopSink};
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::sampler::ColorSampler;
use crate::stabilizer::{IdentityStabilizer, PlayerLock};

/// Random access to decoded frames.
pub trait FrameSource {
    /// Number of frames available.
    fn frame_count(&self) -> usize;

    /// Decode one frame.
    fn frame(&self, index: usize) -> MediaResult<RgbImage>;
}

impl FrameSource for [RgbImage] {
    fn frame_count(&self) -> usize {
        self.len()
    }

    fn frame(&self, index: usize) -> MediaResult<RgbImage> {
        self.get(index)
            .cloned()
            .ok_or_else(|| MediaError::frame_read(index, "index out of range"))
    }
}

impl FrameSource for Vec<RgbImage> {
    fn frame_count(&self) -> usize {
        self.as_slice().frame_count()
    }

    fn frame(&self, index: usize) -> MediaResult<RgbImage> {
        self.as_slice().frame(index)
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssignmentReport {
    /// Whether the team model was fitted on the reference frame
    pub calibrated: bool,
    pub frames: usize,
    /// Detections that produced a raw vote
    pub votes: usize,
    /// Detections that were sampled but produced no vote
    pub abstentions: usize,
    /// Detections of already locked players, not re-sampled
    pub skipped_locked: usize,
    pub locks: Vec<PlayerLock>,
}

/// Assigns a stable team to every tracked player of a clip.
pub struct TeamAssigner<C = KMeans> {
    config: TeamAssignConfig,
    classifier: TeamClassifier<C>,
    builder: ClusterModelBuilder<C>,
    stabilizer: IdentityStabilizer,
    model: Option<ClusterModel>,
    diagnostics: Box<dyn DiagnosticsSink>,
    report: AssignmentReport,
}

impl TeamAssigner<KMeans> {
    /// Create a k-means backed assigner with no diagnostics.
    pub fn new(config: TeamAssignConfig) -> Self {
        let strips = KMeans::two_way(config.sampler.n_init, config.sampler.max_iter, config.sampler.seed);
        let calibration = KMeans::two_way(
            config.calibration.n_init,
            config.calibration.max_iter,
            config.calibration.seed,
        );
        Self::with_clusterers(config, strips, calibration)
    }
}

impl<C: ColorClusterer> TeamAssigner<C> {
    /// Create an assigner with custom clustering backends: one for strip
    /// sampling and classification, one for calibration.
    pub fn with_clusterers(config: TeamAssignConfig, strips: C, calibration: C) -> Self {
        let classifier = TeamClassifier::new(
            ColorSampler::with_clusterer(config.sampler.clone(), strips),
            config.classifier.clone(),
        );
        let builder = ClusterModelBuilder::with_clusterer(config.calibration.min_samples, calibration);
        let stabilizer = IdentityStabilizer::new(config.stabilizer.clone());

        Self {
            config,
            classifier,
            builder,
            stabilizer,
            model: None,
            diagnostics: Box::new(NoopSink),
            report: AssignmentReport::default(),
        }
    }

    /// Attach a diagnostics sink.
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Fitted team model, if calibration succeeded.
    pub fn model(&self) -> Option<&ClusterModel> {
        self.model.as_ref()
    }

    /// Stabilizer state.
    pub fn stabilizer(&self) -> &IdentityStabilizer {
        &self.stabilizer
    }

    /// Fit the team model from the reference frame.
    ///
    /// On failure the assigner stays in unassigned mode: every detection
    /// keeps team 0 for the rest of the run. Returns whether a model exists.
    pub fn calibrate(&mut self, frame: &RgbImage, tracks: &FrameTracks) -> bool {
        let sampler = self.classifier.sampler();
        let samples = tracks
            .iter()
            .map(|(_, detection)| sampler.sample(frame, &detection.bbox));

        match self.builder.build(samples) {
            Ok(calibration) => {
                if let Err(e) = self.diagnostics.on_calibration(&calibration) {
                    warn!(error = %e, "Diagnostics sink failed");
                }
                self.model = Some(calibration.model);
            }
            Err(e) => {
                warn!(error = %e, detections = tracks.len(), "Team calibration failed, all players stay unassigned");
                let reason = match e {
                    MediaError::InsufficientSamples { .. } => "insufficient_samples",
                    _ => "clustering",
                };
                metrics::record_calibration_failure(reason);
                self.model = None;
            }
        }

        self.report.calibrated = self.model.is_some();
        self.report.calibrated
    }

    /// Classify and stabilize every detection of one frame, in place.
    pub fn assign_frame(&mut self, frame_index: usize, frame: &RgbImage, tracks: &mut FrameTracks) {
        for (_, detection) in tracks.iter_mut() {
            let player_id = detection.player_id;

            let vote = if self.stabilizer.is_locked(player_id) {
                self.report.skipped_locked += 1;
                None
            } else {
                let vote = self
                    .classifier
                    .classify(self.model.as_ref(), frame, &detection.bbox, player_id);
                metrics::record_vote(vote.is_some());
                if vote.is_some() {
                    self.report.votes += 1;
                } else {
                    self.report.abstentions += 1;
                }
                vote
            };

            let team = self.stabilizer.observe(player_id, vote, frame_index);
            detection.set_team(team, self.display_color(team));
        }

        self.report.frames += 1;
        metrics::record_frame();
    }

    /// Display color for a team: its prototype, or the fallback for team 0.
    pub fn display_color(&self, team: TeamId) -> [u8; 3] {
        self.model
            .as_ref()
            .and_then(|m| m.team_color(team))
            .map(|c| c.to_bytes())
            .unwrap_or(self.config.fallback_color)
    }

    /// Run the whole clip.
    ///
    /// Zero frames, a frame/tracks count mismatch and unreadable frames are
    /// fatal. Everything else degrades to team 0.
    pub fn run<S>(mut self, frames: &S, tracks: &mut Tracks) -> MediaResult<AssignmentReport>
    where
        S: FrameSource + ?Sized,
    {
        let frame_count = frames.frame_count();
        if frame_count == 0 {
            return Err(MediaError::NoFrames);
        }
        if frame_count != tracks.len() {
            return Err(MediaError::FrameCountMismatch {
                frames: frame_count,
                tracks: tracks.len(),
            });
        }

        info!(frames = frame_count, "Starting team assignment");

        for (index, frame_tracks) in tracks.frames.iter_mut().enumerate() {
            let frame = frames.frame(index)?;
            if index == 0 {
                self.calibrate(&frame, frame_tracks);
            }
            self.assign_frame(index, &frame, frame_tracks);
        }

        self.report.locks = self.stabilizer.locks();
        info!(
            frames = self.report.frames,
            calibrated = self.report.calibrated,
            players = self.stabilizer.player_count(),
            locked = self.report.locks.len(),
            votes = self.report.votes,
            abstentions = self.report.abstentions,
            "Team assignment complete"
        );

        Ok(self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb as Pixel;
    use teamlock_models::{BoundingBox, Detection, RoleCategory};

    const RED: [u8; 3] = [210, 30, 25];
    const BLUE: [u8; 3] = [20, 40, 190];

    fn frame() -> RgbImage {
        let mut img = RgbImage::from_pixel(80, 60, Pixel([90, 140, 70]));
        for y in 5..55 {
            for x in 5..30 {
                img.put_pixel(x, y, Pixel(RED));
            }
            for x in 45..70 {
                img.put_pixel(x, y, Pixel(BLUE));
            }
        }
        img
    }

    fn red_box() -> BoundingBox {
        BoundingBox::new(5.0, 5.0, 30.0, 55.0)
    }

    fn blue_box() -> BoundingBox {
        BoundingBox::new(45.0, 5.0, 70.0, 55.0)
    }

    fn two_players(frames: usize) -> Tracks {
        Tracks::new(
            (0..frames)
                .map(|i| {
                    let mut ft = FrameTracks::new();
                    ft.insert(RoleCategory::Skill, Detection::new(1, red_box(), i));
                    ft.insert(RoleCategory::Db, Detection::new(2, blue_box(), i));
                    ft
                })
                .collect(),
        )
    }

    fn team_of(tracks: &Tracks, frame: usize, role: RoleCategory, player: u32) -> &Detection {
        &tracks.frames[frame].role(role).unwrap()[&player]
    }

    #[test]
    fn test_players_lock_after_three_frames() {
        let frames = vec![frame(); 4];
        let mut tracks = two_players(4);

        let report = TeamAssigner::new(TeamAssignConfig::default())
            .run(&frames, &mut tracks)
            .unwrap();

        assert!(report.calibrated);
        assert_eq!(report.frames, 4);
        assert_eq!(report.votes, 6);
        assert_eq!(report.skipped_locked, 2);
        assert_eq!(
            report.locks,
            vec![
                PlayerLock { player_id: 1, team: TeamId::One, locked_at_frame: 2 },
                PlayerLock { player_id: 2, team: TeamId::Two, locked_at_frame: 2 },
            ]
        );

        for f in 0..4 {
            let red = team_of(&tracks, f, RoleCategory::Skill, 1);
            let blue = team_of(&tracks, f, RoleCategory::Db, 2);
            assert_eq!(red.team_id, TeamId::One);
            assert_eq!(red.team_color, Some(RED));
            assert_eq!(blue.team_id, TeamId::Two);
            assert_eq!(blue.team_color, Some(BLUE));
        }
    }

    #[test]
    fn test_calibration_failure_leaves_everyone_unassigned() {
        let frames = vec![frame(); 3];
        let mut tracks = Tracks::new(
            (0..3)
                .map(|i| {
                    let mut ft = FrameTracks::new();
                    ft.insert(RoleCategory::Qb, Detection::new(7, red_box(), i));
                    if i > 0 {
                        ft.insert(RoleCategory::Lb, Detection::new(8, blue_box(), i));
                    }
                    ft
                })
                .collect(),
        );

        let report = TeamAssigner::new(TeamAssignConfig::default())
            .run(&frames, &mut tracks)
            .unwrap();

        assert!(!report.calibrated);
        assert_eq!(report.votes, 0);
        assert!(report.locks.is_empty());
        for ft in &tracks.frames {
            for (_, det) in ft.iter() {
                assert_eq!(det.team_id, TeamId::Unassigned);
                assert_eq!(det.team_color, Some([128, 128, 128]));
            }
        }
    }

    #[test]
    fn test_small_box_never_advances() {
        let frames = vec![frame(); 3];
        let mut tracks = two_players(3);
        for (i, ft) in tracks.frames.iter_mut().enumerate() {
            ft.insert(
                RoleCategory::Center,
                Detection::new(9, BoundingBox::new(10.0, 10.0, 13.0, 13.0), i),
            );
        }

        let mut assigner = TeamAssigner::new(TeamAssignConfig::default());
        for (i, ft) in tracks.frames.iter_mut().enumerate() {
            if i == 0 {
                assert!(assigner.calibrate(&frames[0], ft));
            }
            assigner.assign_frame(i, &frames[i], ft);
        }

        let record = assigner.stabilizer().record(9).unwrap();
        assert!(record.window.is_empty());
        assert_eq!(assigner.stabilizer().team(9), TeamId::Unassigned);
        assert_eq!(team_of(&tracks, 2, RoleCategory::Center, 9).team_id, TeamId::Unassigned);
    }

    #[test]
    fn test_outputs_always_valid_team_ids() {
        let frames = vec![frame(); 2];
        let mut tracks = two_players(2);
        tracks.frames[1].insert(
            RoleCategory::Skill,
            Detection::new(3, BoundingBox::new(-50.0, -50.0, 500.0, 500.0), 1),
        );

        TeamAssigner::new(TeamAssignConfig::default())
            .run(&frames, &mut tracks)
            .unwrap();

        for ft in &tracks.frames {
            for (_, det) in ft.iter() {
                assert!(u8::from(det.team_id) <= 2);
            }
        }
    }

    #[test]
    fn test_no_frames_is_fatal() {
        let frames: Vec<RgbImage> = Vec::new();
        let mut tracks = Tracks::default();
        let result = TeamAssigner::new(TeamAssignConfig::default()).run(&frames, &mut tracks);
        assert!(matches!(result, Err(MediaError::NoFrames)));
    }

    #[test]
    fn test_count_mismatch_is_fatal() {
        let frames = vec![frame(); 2];
        let mut tracks = two_players(3);
        let result = TeamAssigner::new(TeamAssignConfig::default()).run(&frames, &mut tracks);
        assert!(matches!(
            result,
            Err(MediaError::FrameCountMismatch { frames: 2, tracks: 3 })
        ));
    }

    #[test]
    fn test_diagnostics_sink_receives_calibration() {
        struct Counting(std::rc::Rc<std::cell::Cell<usize>>);
        impl DiagnosticsSink for Counting {
            fn on_calibration(&mut self, calibration: &crate::calibration::Calibration) -> MediaResult<()> {
                assert_eq!(calibration.samples.len(), 2);
                self.0.set(self.0.get() + 1);
                Ok(())
            }
        }

        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let frames = vec![frame(); 2];
        let mut tracks = two_players(2);
        TeamAssigner::new(TeamAssignConfig::default())
            .with_diagnostics(Box::new(Counting(calls.clone())))
            .run(&frames, &mut tracks)
            .unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_classification_uses_injected_clusterer() {
        use crate::clustering::{ClusterFit, MockColorClusterer};
        use teamlock_models::Rgb;

        let mut strips = MockColorClusterer::new();
        strips.expect_fit().returning(|points| {
            Ok(ClusterFit {
                centroids: vec![Rgb::default(), Rgb::default()],
                labels: vec![0; points.len()],
                inertia: 0.0,
            })
        });
        // Two players over three frames, nobody locked before the last vote
        strips.expect_nearest().times(6).returning(|_, _| 0);

        let mut calibration = MockColorClusterer::new();
        calibration.expect_fit().times(1).returning(|_| {
            Ok(ClusterFit {
                centroids: vec![Rgb::new(210.0, 30.0, 25.0), Rgb::new(20.0, 40.0, 190.0)],
                labels: vec![0, 1],
                inertia: 0.0,
            })
        });

        let frames = vec![frame(); 3];
        let mut tracks = two_players(3);
        let report = TeamAssigner::with_clusterers(TeamAssignConfig::default(), strips, calibration)
            .run(&frames, &mut tracks)
            .unwrap();

        // Cluster 0 is the red prototype, so even the blue player follows it
        assert_eq!(team_of(&tracks, 2, RoleCategory::Db, 2).team_id, TeamId::One);
        assert!(report.locks.iter().all(|lock| lock.team == TeamId::One));
        assert_eq!(report.locks.len(), 2);
    }
}
