//! Replays written to and read back from disk.

use battle_core::prelude::*;
use battle_test_utils::fixtures::{autoplay, duel, sample_provider};

#[test]
fn test_human_battle_replay_survives_disk() {
    let mut battle = Battle::new(duel(99, "squire", "goblin", Controller::Human), sample_provider()).unwrap();
    autoplay(&mut battle, &mut ImmediateSink).unwrap();
    let replay = BattleReplay::record(&battle);
    assert!(replay.command_count() > 0);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("duel.replay");
    replay.save(&path).unwrap();
    assert!(path.exists());

    let loaded = BattleReplay::load(&path).unwrap();
    assert_eq!(loaded, replay);
    assert!(loaded.verify(sample_provider()).unwrap());
}

#[test]
fn test_garbage_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.replay");
    std::fs::write(&path, b"not a replay").unwrap();
    assert!(BattleReplay::load(&path).is_err());
    assert!(BattleReplay::load(dir.path().join("missing.replay")).is_err());
}
