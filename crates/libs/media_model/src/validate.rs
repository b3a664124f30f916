use crate::{span_seconds, Media, MediaSummary};
use thiserror::Error;

/// Scenes shorter than this are prompted against and flagged on ingest.
pub const MIN_SCENE_SECONDS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("summary is missing a title")]
    MissingTitle,
    #[error("category '{0}' is not in the configured set")]
    UnknownCategory(String),
    #[error("rating '{0}' is not in the configured set")]
    UnknownRating(String),
    #[error("scene time stamp {index}: {source}")]
    BadTimeSpan {
        index: usize,
        source: crate::TimecodeError,
    },
    #[error("scene {sequence}: {source}")]
    BadSceneSpan {
        sequence: i32,
        source: crate::TimecodeError,
    },
    #[error("scene sequences are not a gap-free 1-based run (found {found} at position {position})")]
    BrokenSequence { position: usize, found: i32 },
    #[error("scenes cover {covered}s but the media is only {length}s long")]
    ScenesExceedLength { covered: u32, length: i64 },
}

/// Strictly validates a model-produced summary against the configured closed
/// sets. Returns soft warnings (short scenes) on success.
pub fn validate_summary(
    summary: &MediaSummary,
    known_categories: &[String],
    known_ratings: &[String],
) -> Result<Vec<String>, ValidationError> {
    if summary.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    if !summary.category.is_empty() && !known_categories.iter().any(|c| c == &summary.category) {
        return Err(ValidationError::UnknownCategory(summary.category.clone()));
    }
    if !summary.rating.is_empty() && !known_ratings.iter().any(|r| r == &summary.rating) {
        return Err(ValidationError::UnknownRating(summary.rating.clone()));
    }

    let mut warnings = Vec::new();
    for (index, span) in summary.scene_time_stamps.iter().enumerate() {
        let seconds = span_seconds(&span.start, &span.end)
            .map_err(|source| ValidationError::BadTimeSpan { index, source })?;
        if seconds < MIN_SCENE_SECONDS {
            warnings.push(format!(
                "scene span {index} ({}..{}) is shorter than {MIN_SCENE_SECONDS}s",
                span.start, span.end
            ));
        }
    }
    Ok(warnings)
}

/// Checks the ordering invariants of an assembled `Media`: sequences form a
/// gap-free 1-based run, every scene has `end > start`, and total covered time
/// does not exceed the media length (when a length is known).
pub fn validate_media(media: &Media) -> Result<(), ValidationError> {
    let mut covered: u32 = 0;
    for (position, scene) in media.scenes.iter().enumerate() {
        let expected = i32::try_from(position).unwrap_or(i32::MAX) + 1;
        if scene.sequence != expected {
            return Err(ValidationError::BrokenSequence {
                position,
                found: scene.sequence,
            });
        }
        let seconds = span_seconds(&scene.start, &scene.end).map_err(|source| {
            ValidationError::BadSceneSpan {
                sequence: scene.sequence,
                source,
            }
        })?;
        covered += seconds;
    }
    if media.length_seconds > 0 && i64::from(covered) > media.length_seconds {
        return Err(ValidationError::ScenesExceedLength {
            covered,
            length: media.length_seconds,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{example_summary, Scene, TimeSpan};

    fn closed_sets() -> (Vec<String>, Vec<String>) {
        (
            vec!["trailer".into(), "movie".into()],
            vec!["G".into(), "PG".into(), "PG-13".into()],
        )
    }

    #[test]
    fn accepts_well_formed_summary_with_short_scene_warning() {
        let (categories, ratings) = closed_sets();
        let summary = example_summary();
        let warnings = validate_summary(&summary, &categories, &ratings).unwrap();
        // the canonical example uses 5s spans, below the 10s floor
        assert_eq!(warnings.len(), summary.scene_time_stamps.len());
    }

    #[test]
    fn rejects_unknown_category_and_rating() {
        let (categories, ratings) = closed_sets();
        let mut summary = example_summary();
        summary.category = "podcast".into();
        assert_eq!(
            validate_summary(&summary, &categories, &ratings),
            Err(ValidationError::UnknownCategory("podcast".into()))
        );

        let mut summary = example_summary();
        summary.rating = "X".into();
        assert_eq!(
            validate_summary(&summary, &categories, &ratings),
            Err(ValidationError::UnknownRating("X".into()))
        );
    }

    #[test]
    fn rejects_malformed_and_inverted_spans() {
        let (categories, ratings) = closed_sets();
        let mut summary = example_summary();
        summary.scene_time_stamps = vec![TimeSpan {
            start: "00:00:10".into(),
            end: "00:00:05".into(),
        }];
        assert!(validate_summary(&summary, &categories, &ratings).is_err());
    }

    fn media_with_scenes(scenes: Vec<Scene>) -> Media {
        let mut media = Media::new("ordering.mp4");
        media.length_seconds = 120;
        media.scenes = scenes;
        media
    }

    #[test]
    fn media_sequences_must_be_gap_free_from_one() {
        let media = media_with_scenes(vec![
            Scene {
                sequence: 1,
                start: "00:00:00".into(),
                end: "00:00:30".into(),
                script: "a".into(),
            },
            Scene {
                sequence: 3,
                start: "00:00:31".into(),
                end: "00:01:00".into(),
                script: "b".into(),
            },
        ]);
        assert_eq!(
            validate_media(&media),
            Err(ValidationError::BrokenSequence {
                position: 1,
                found: 3
            })
        );
    }

    #[test]
    fn media_scenes_cannot_outrun_the_length() {
        let mut media = media_with_scenes(vec![Scene {
            sequence: 1,
            start: "00:00:00".into(),
            end: "00:03:00".into(),
            script: "a".into(),
        }]);
        media.length_seconds = 60;
        assert!(matches!(
            validate_media(&media),
            Err(ValidationError::ScenesExceedLength { .. })
        ));
    }
}
