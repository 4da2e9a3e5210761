use stoptalk_core::{
    Command,
    content,
    events::SpeechEvent,
    formatter::{ResponseFormatter, UtteranceDraft},
    phase::{PhaseState, TurnKind},
    session::CoachingSession,
    validator::IssueKind,
};

fn spoken_texts(commands: &[Command]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::Speak { response, .. } => Some(response.text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn full_lesson_runs_through_every_phase() {
    let mut session = CoachingSession::new("2", ResponseFormatter::seeded(11), 5);
    assert_eq!(session.band().label(), "K-2");

    session.open();
    session.handle_event(SpeechEvent::PlaybackFinished).unwrap();
    session
        .handle_event(SpeechEvent::TurnCompleted { transcript: "Hi, I'm Mia".into() })
        .unwrap();

    session.advance_phase();
    assert_eq!(session.phase(), PhaseState::GuidedRepetition);
    session.respond(&UtteranceDraft::new("Great!", "Say it louder."), TurnKind::Coaching);

    let commands = session.advance_phase();
    assert_eq!(session.phase(), PhaseState::ScenarioPractice);
    assert!(commands.iter().any(|c| matches!(
        c,
        Command::PhaseChanged { to: PhaseState::ScenarioPractice, .. }
    )));
    assert!(session.character().active);

    let line = UtteranceDraft::new(
        "",
        "Hey, I'm new. Who are you? Where do you sit? Do you like tag?",
    );
    for turn in 1..=5 {
        let commands = session.respond(&line, TurnKind::Character);
        if turn < 5 {
            assert_eq!(spoken_texts(&commands).len(), 1);
            assert!(session.character().active);
        } else {
            let texts = spoken_texts(&commands);
            assert_eq!(texts.len(), 2, "exit utterance follows the fifth line");
            assert!(texts[1].starts_with(content::CHARACTER_EXIT_PRAISE));
            assert!(!session.character().active);
            assert_eq!(session.character().exchange_count, 5);
        }
    }

    session.advance_phase();
    assert_eq!(session.phase(), PhaseState::Variation);
    assert!(session.advance_phase().is_empty());

    let summary = session.summary();
    // Demonstrate cue, guided cue, guided turn, exit and variation cue are
    // checked; the scenario cue and the five character lines are exempt.
    assert_eq!(summary.exempt_responses, 6);
    assert_eq!(summary.total_responses, 5);

    let exported: serde_json::Value = serde_json::from_str(&session.export_log().unwrap()).unwrap();
    assert_eq!(exported["results"].as_array().unwrap().len(), 11);
}

#[test]
fn overlong_coaching_is_truncated_but_still_delivered() {
    let mut session = CoachingSession::new(1i64, ResponseFormatter::seeded(3), 5);
    let draft = UtteranceDraft::new(
        "Wow, that was a really wonderful hello!",
        "Next, ask your friend what game they like best.",
    );
    let commands = session.respond(&draft, TurnKind::Coaching);
    let (response, validation) = match &commands[0] {
        Command::Speak { response, validation, .. } => (response, validation),
        other => panic!("expected Speak, got {other:?}"),
    };

    assert!(response.truncated);
    assert_eq!(response.word_count, 8);
    assert!(response.text.ends_with('!'));
    // The turn signal was cut off by truncation; the validator notices.
    assert_eq!(validation.issues, vec![IssueKind::MissingTurnSignal]);
}

#[test]
fn malformed_grade_never_blocks_a_session() {
    let mut session = CoachingSession::new("second grade-ish", ResponseFormatter::seeded(1), 5);
    assert_eq!(session.band().label(), "6-8");
    assert_eq!(session.open().len(), 1);
}
