mod support;

use support::*;
use vr180::{
    ENTER_LABEL, EXIT_LABEL, MediaElement, MediaEvent, PlayerEvent, RequestTicket, SessionState,
    TextureTransform, Tick, XrError, XrFrame, XrSession,
};

#[test]
fn unsupported_platform_hides_the_enter_control() {
    let mut player = player_with(FakePlatform::unsupported(), test_media());
    player.media_mut().load();
    player.pump(0.0);

    assert!(!player.chrome().enter.visible);
    assert!(!player.chrome().enter.enabled);
    assert!(!player.chrome().info_visible);

    enter(&mut player, 0.0);
    assert!(player.platform().requests.is_empty());
    assert_eq!(player.lifecycle().state(), SessionState::Idle);
}

#[test]
fn failed_capability_check_counts_as_unsupported() {
    let mut platform = FakePlatform::default();
    platform.supported = Err(XrError::Platform("probe crashed".into()));
    let player = player_with(platform, test_media());
    assert!(!player.chrome().enter.visible);
}

#[test]
fn enter_control_waits_for_media() {
    let mut player = player_with(FakePlatform::default(), test_media());
    player.pump(0.0);
    assert!(player.chrome().enter.visible);
    assert!(!player.chrome().enter.enabled);

    enter(&mut player, 0.0);
    assert!(player.platform().requests.is_empty());

    player.media_mut().load();
    player.pump(0.0);
    assert!(player.chrome().enter.enabled);
    assert_eq!(player.chrome().enter.label, ENTER_LABEL);
}

#[test]
fn media_error_disables_entry() {
    let mut player = ready_player(FakePlatform::default());
    player.media_mut().fail("corrupt stream");
    player.pump(0.0);
    assert!(!player.chrome().enter.enabled);
}

#[test]
fn request_asks_for_configured_features() {
    let mut player = ready_player(FakePlatform::answering(Answer::Hold));
    enter(&mut player, 0.0);
    let (ticket, features) = player.platform().requests[0].clone();
    assert_eq!(features, vec!["local-floor".to_string()]);
    assert_eq!(player.lifecycle().state(), SessionState::Requesting { ticket });
}

#[test]
fn rejected_request_leaves_the_flat_page_usable() {
    let mut player = ready_player(FakePlatform::answering(Answer::Reject(
        XrError::PermissionDenied,
    )));
    enter(&mut player, 0.0);

    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert!(!player.scene().dome_visible());
    assert!(player.backend().created.is_empty());
    assert_eq!(player.lifecycle().texture(), None);
    assert!(player.chrome().enter.enabled);
    assert_eq!(player.chrome().enter.label, ENTER_LABEL);

    // The user may retry.
    player.platform_mut().answer = Answer::Grant;
    enter(&mut player, 10.0);
    assert!(player.lifecycle().is_active());
}

#[test]
fn entering_binds_the_stereo_texture_and_starts_playback() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);

    let lifecycle = player.lifecycle();
    assert_eq!(lifecycle.state(), SessionState::Active);
    assert!(player.is_presenting());
    assert!(player.scene().dome_visible());
    assert_eq!(player.backend().created, vec![FRAME_SIZE]);
    assert_eq!(player.scene().video_binding(), lifecycle.texture());
    assert!(player.frame_loop().is_running());
    assert!(playing(&player));
    assert!(!player.scene().panel_visible());
    assert_eq!(player.chrome().enter.label, EXIT_LABEL);

    let id = session_id(&player);
    assert!(player.platform().has_notifier(id));
}

#[test]
fn frames_sample_one_half_per_eye() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);

    assert_eq!(player.on_frame(Some(&stereo_frame(16.0)), 16.0), Tick::Rendered);
    let record = player.backend().renders.last().cloned().unwrap();
    assert!(record.presenting);
    assert_eq!(
        record.video_transforms,
        vec![TextureTransform::LEFT_HALF, TextureTransform::RIGHT_HALF]
    );
    assert_eq!(record.video_bound, player.lifecycle().texture());
}

#[test]
fn frame_without_pose_is_skipped() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    let empty = XrFrame::new(16.0, Vec::new());
    assert_eq!(player.on_frame(Some(&empty), 16.0), Tick::Skipped);
    assert_eq!(player.on_frame(None, 32.0), Tick::Skipped);
    assert!(player.backend().renders.is_empty());
    assert!(player.lifecycle().is_active());
}

#[test]
fn frames_outside_a_session_do_nothing() {
    let mut player = ready_player(FakePlatform::default());
    assert_eq!(player.on_frame(Some(&stereo_frame(0.0)), 0.0), Tick::Stopped);
    assert!(player.backend().renders.is_empty());
}

#[test]
fn double_exit_tears_down_once() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    let texture = player.lifecycle().texture().unwrap();

    let events = player.events();
    events.send(PlayerEvent::ToggleSession);
    events.send(PlayerEvent::ToggleSession);
    player.pump(100.0);

    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert_eq!(player.backend().disposed, vec![texture]);
    assert_eq!(player.platform().end_calls(), 1);
    assert_eq!(player.lifecycle().teardowns(), 1);
    assert!(!player.scene().dome_visible());
    assert!(!playing(&player));
    assert_eq!(player.backend().flat_restores, 1);
    assert_eq!(player.chrome().enter.label, ENTER_LABEL);
}

fn exit_then_media_end(first: PlayerEvent, second: PlayerEvent) {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    let texture = player.lifecycle().texture().unwrap();

    let events = player.events();
    events.send(first);
    events.send(second);
    player.pump(100.0);

    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert_eq!(player.platform().end_calls(), 1);
    assert_eq!(player.backend().disposed, vec![texture]);
    assert_eq!(player.lifecycle().teardowns(), 1);
    assert!(player.backend().live.is_empty());
}

#[test]
fn exit_click_then_media_end_tears_down_once() {
    exit_then_media_end(
        PlayerEvent::ToggleSession,
        PlayerEvent::Media(MediaEvent::Ended),
    );
}

#[test]
fn media_end_then_exit_click_tears_down_once() {
    exit_then_media_end(
        PlayerEvent::Media(MediaEvent::Ended),
        PlayerEvent::ToggleSession,
    );
}

#[test]
fn context_loss_while_ending_does_not_end_again() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    let id = session_id(&player);

    let events = player.events();
    events.send(PlayerEvent::ToggleSession);
    events.send(PlayerEvent::ContextLost);
    player.pump(50.0);

    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert_eq!(player.platform().end_calls(), 1);
    assert_eq!(player.lifecycle().teardowns(), 1);
    assert!(!player.platform().has_notifier(id));
    assert!(player.backend().live.is_empty());
}

#[test]
fn render_failure_while_ending_does_not_end_again() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    player.handle_event(PlayerEvent::ToggleSession, 50.0);
    assert_eq!(player.lifecycle().state(), SessionState::Ending);
    assert!(player.frame_loop().is_running());

    player.backend_mut().fail_render = true;
    assert_eq!(player.on_frame(Some(&stereo_frame(66.0)), 66.0), Tick::Stopped);
    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert_eq!(player.platform().end_calls(), 1);

    // The end notice queued by the first `end()` is now stale.
    player.pump(80.0);
    assert_eq!(player.lifecycle().teardowns(), 1);
    assert_eq!(player.lifecycle().state(), SessionState::Idle);
}

#[test]
fn platform_ending_the_session_cleans_up() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    let id = session_id(&player);

    player.platform_mut().end_externally(id);
    player.pump(50.0);

    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert!(player.backend().live.is_empty());
    assert!(!player.scene().dome_visible());
    assert!(!player.frame_loop().is_running());
    assert_eq!(player.lifecycle().teardowns(), 1);

    // A late duplicate notice is stale.
    player.events().send(PlayerEvent::SessionEnded(id));
    player.pump(60.0);
    assert_eq!(player.lifecycle().teardowns(), 1);
}

#[test]
fn failing_end_still_cleans_up() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    player.platform().log.borrow_mut().fail_end = true;

    enter(&mut player, 10.0);
    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert!(player.backend().live.is_empty());
    assert_eq!(player.lifecycle().teardowns(), 1);
}

#[test]
fn context_loss_tears_down_immediately() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    let id = session_id(&player);

    player.events().send(PlayerEvent::ContextLost);
    player.pump(20.0);

    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert!(player.backend().live.is_empty());
    assert_eq!(player.platform().ended(), vec![id]);
    assert!(!player.platform().has_notifier(id));

    // Restoring afterwards does not bring a texture back.
    player.events().send(PlayerEvent::ContextRestored);
    player.pump(30.0);
    assert_eq!(player.backend().created.len(), 1);
}

#[test]
fn context_restored_reallocates_while_active() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    let first = player.lifecycle().texture().unwrap();

    player.events().send(PlayerEvent::ContextRestored);
    player.pump(20.0);

    let second = player.lifecycle().texture().unwrap();
    assert_ne!(first, second);
    assert_eq!(player.backend().disposed, vec![first]);
    assert_eq!(player.backend().live.len(), 1);
    assert_eq!(player.scene().video_binding(), Some(second));
    assert!(player.lifecycle().is_active());
}

#[test]
fn render_failure_ends_the_session() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    player.backend_mut().fail_render = true;

    assert_eq!(player.on_frame(Some(&stereo_frame(16.0)), 16.0), Tick::Stopped);
    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert!(player.backend().live.is_empty());
    assert!(!player.frame_loop().is_running());
    assert_eq!(player.chrome().enter.label, ENTER_LABEL);
}

#[test]
fn allocation_failure_rolls_back_entry() {
    let mut player = ready_player(FakePlatform::default());
    player.backend_mut().fail_allocation = true;
    enter(&mut player, 0.0);

    assert_eq!(player.lifecycle().state(), SessionState::Idle);
    assert!(!player.scene().dome_visible());
    assert!(!playing(&player));
    assert_eq!(player.platform().end_calls(), 1);
    assert!(!player.frame_loop().is_running());
    assert!(player.chrome().enter.enabled);
}

#[test]
fn reentry_leaves_exactly_one_live_texture() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    enter(&mut player, 100.0);
    enter(&mut player, 200.0);

    assert!(player.lifecycle().is_active());
    assert_eq!(player.backend().created.len(), 2);
    assert_eq!(player.backend().disposed.len(), 1);
    assert_eq!(player.backend().live.len(), 1);
    let live = *player.backend().live.iter().next().unwrap();
    assert_eq!(player.scene().video_binding(), Some(live));
    assert_eq!(player.lifecycle().teardowns(), 1);
    assert!(!player.scene().panel_visible());
}

#[test]
fn reentry_shows_controls_matching_the_media() {
    let mut player = ready_player(FakePlatform::default());
    enter(&mut player, 0.0);
    enter(&mut player, 100.0);
    assert_eq!(player.lifecycle().state(), SessionState::Idle);

    // Changed while flat: half way through, muted, and unable to resume.
    let media = player.media_mut();
    media.set_current_time(DURATION / 2.0);
    media.set_muted(true);
    media.block_playback("autoplay");
    enter(&mut player, 200.0);

    assert!(player.lifecycle().is_active());
    assert!(player.media().paused());
    assert!(player.icons().showing_play());
    assert!(player.icons().showing_muted());
    let (scale_x, _) = player.scene().seek_progress();
    assert!((scale_x - 0.5).abs() < 1e-4);
}

#[test]
fn stale_grant_is_ended_without_entering() {
    let mut player = ready_player(FakePlatform::answering(Answer::Hold));
    enter(&mut player, 0.0);
    let (ticket, _) = player.platform().requests[0].clone();

    let stale = player.platform_mut().new_session();
    let stale_id = stale.id();
    player.events().send(PlayerEvent::SessionGranted {
        ticket: RequestTicket(ticket.0 + 41),
        session: stale,
    });
    player.pump(5.0);
    assert_eq!(player.lifecycle().state(), SessionState::Requesting { ticket });
    assert_eq!(player.platform().ended(), vec![stale_id]);
    assert!(player.backend().created.is_empty());

    let session = player.platform_mut().new_session();
    player
        .events()
        .send(PlayerEvent::SessionGranted { ticket, session });
    player.pump(10.0);
    assert!(player.lifecycle().is_active());
}

#[test]
fn stale_rejection_is_ignored() {
    let mut player = ready_player(FakePlatform::answering(Answer::Hold));
    enter(&mut player, 0.0);
    let (ticket, _) = player.platform().requests[0].clone();
    player.events().send(PlayerEvent::SessionRejected {
        ticket: RequestTicket(ticket.0 + 1),
        error: XrError::DeviceBusy,
    });
    player.pump(5.0);
    assert_eq!(player.lifecycle().state(), SessionState::Requesting { ticket });
}

#[test]
fn resize_is_ignored_while_presenting() {
    let mut player = ready_player(FakePlatform::default());
    player.events().send(PlayerEvent::Resized {
        width: 800,
        height: 600,
    });
    player.pump(0.0);
    assert_eq!(player.flat_size(), Some((800, 600)));

    enter(&mut player, 0.0);
    player.events().send(PlayerEvent::Resized {
        width: 1024,
        height: 768,
    });
    player.pump(10.0);
    assert_eq!(player.backend().flat_resizes, vec![(800, 600)]);
    assert_eq!(player.flat_size(), Some((800, 600)));
}

#[test]
fn flat_render_samples_the_whole_frame() {
    let mut player = ready_player(FakePlatform::default());
    let view = vr180::Camera::default().flat_view(1.5);
    player.render_flat(view).unwrap();
    let record = player.backend().renders.last().cloned().unwrap();
    assert!(!record.presenting);
    assert_eq!(record.video_transforms, vec![TextureTransform::FULL]);
    assert!(!player.media().ended());
}
