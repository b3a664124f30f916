use crate::{CastMember, MediaSummary, Scene, TimeSpan};

/// Canonical example summary used for few-shot prompt seeding.
#[must_use]
pub fn example_summary() -> MediaSummary {
    MediaSummary {
        title: "Serenity".into(),
        category: "trailer".into(),
        summary: "The crew of the ship Serenity try to evade an assassin sent to recapture telepath River.".into(),
        length_seconds: 120,
        media_url: Some("https://storage.mtls.cloud.google.com/bucket_name/Serenity.mp4".into()),
        director: "Joss Whedon".into(),
        release_year: 2005,
        genre: "Science Fiction".into(),
        rating: "PG-13".into(),
        cast: vec![
            CastMember {
                character_name: "Malcolm Reynolds".into(),
                actor_name: "Nathan Fillion".into(),
            },
            CastMember {
                character_name: "River Tam".into(),
                actor_name: "Summer Glau".into(),
            },
            CastMember {
                character_name: "Simon Tam".into(),
                actor_name: "Sean Maher".into(),
            },
        ],
        scene_time_stamps: vec![
            TimeSpan {
                start: "00:00:00".into(),
                end: "00:00:05".into(),
            },
            TimeSpan {
                start: "00:00:06".into(),
                end: "00:00:10".into(),
            },
        ],
    }
}

/// Canonical example scene used for few-shot prompt seeding.
#[must_use]
pub fn example_scene() -> Scene {
    Scene {
        sequence: 1,
        start: "00:00:00".into(),
        end: "00:01:00".into(),
        script: r"
INT. BATTLEFIELD - DAY

A fierce battle is raging. Soldiers are fighting and dying all around.

VOICEOVER (V.O.) - (Nathan Fillion)
I aim to misbehave.

We see a young woman, RIVER TAM (16), running through the battlefield. She is terrified and covered in blood.

RIVER (V.O.) - (Summer Glau)
They were right. They were always right.

River stumbles and falls. She looks up to see a man standing over her. He is SIMON TAM (26), her older brother.

SIMON - (Sean Maher)
It's all right, River. I'm here.

Simon helps River to her feet. They run away together."
            .into(),
    }
}
