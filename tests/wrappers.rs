mod common;

use ndarray::{ArrayD, IxDyn};

use arcadenet::wrappers::{ROUND_WIN_REWARD, TOP_CROP};
use arcadenet::{
    ChannelFirst, ChannelWiseFrameStack, ConfigError, Dtype, EnvError, EnvExt, Environment,
    FrameStack, Normalize, Observation, ProgressiveReward, RemoveNoop, SkipRedundantFrames,
    StopOnRoundEnd, SurvivalReward, Wrapper,
};

use common::{ScriptedEnv, ScriptedStep};

fn pixels(shape: &[usize], fill: u8) -> Observation {
    Observation::U8(ArrayD::from_elem(IxDyn(shape), fill))
}

fn gradient(shape: &[usize]) -> Observation {
    let len: usize = shape.iter().product();
    let values = (0..len).map(|value| (value * 7 % 256) as u8).collect();
    Observation::U8(ArrayD::from_shape_vec(IxDyn(shape), values).expect("gradient shape"))
}

fn with_rewards(rewards: &[f64]) -> ScriptedEnv {
    let steps = rewards
        .iter()
        .map(|reward| ScriptedStep::new(pixels(&[1, 1], 0)).with_reward(*reward))
        .collect();
    ScriptedEnv::from_steps(pixels(&[1, 1], 0), steps)
}

#[test]
fn survival_reward_skips_terminal_steps() -> Result<(), EnvError> {
    let steps = vec![
        ScriptedStep::new(pixels(&[1, 1], 0)).with_reward(0.5),
        ScriptedStep::new(pixels(&[1, 1], 0))
            .with_reward(-1.0)
            .terminated(),
    ];
    let inner = ScriptedEnv::from_steps(pixels(&[1, 1], 0), steps);
    let mut env = SurvivalReward::with_reward(inner, 0.25);
    env.reset(None)?;
    assert_eq!(env.step(0)?.reward, 0.75);
    assert_eq!(env.step(0)?.reward, -1.0);
    Ok(())
}

#[test]
fn stop_on_round_end_matches_either_sign() -> Result<(), EnvError> {
    let inner = with_rewards(&[1.0, -1.0, 0.5, 0.0, 2.0]);
    let mut env = StopOnRoundEnd::with_stop_reward(inner, 1.0);
    env.reset(None)?;
    let terminated: Vec<bool> = (0..5)
        .map(|_| env.step(0).map(|step| step.terminated))
        .collect::<Result<_, _>>()?;
    assert_eq!(terminated, vec![true, true, false, false, false]);
    Ok(())
}

#[test]
fn stop_on_round_end_leaves_existing_termination() -> Result<(), EnvError> {
    let steps = vec![
        ScriptedStep::new(pixels(&[1, 1], 0))
            .with_reward(0.0)
            .terminated(),
    ];
    let mut env = StopOnRoundEnd::new(ScriptedEnv::from_steps(pixels(&[1, 1], 0), steps));
    env.reset(None)?;
    assert!(env.step(0)?.terminated);
    Ok(())
}

#[test]
fn progressive_bonus_grows_then_resets_on_win() -> Result<(), EnvError> {
    let mut rewards = vec![0.0; 301];
    rewards.push(1.0);
    let base = 0.001;
    let mut env = ProgressiveReward::with_base_reward(with_rewards(&rewards), base);
    env.reset(None)?;

    let mut previous = 0.0;
    for expected_steps in 0..=300u64 {
        assert_eq!(env.round_steps(), expected_steps);
        let reward = env.step(0)?.reward;
        assert!(reward >= previous, "bonus decreased at step {expected_steps}");
        previous = reward;
    }
    assert!((previous - base * 12.0).abs() < 1e-12);

    let win = env.step(0)?;
    assert_eq!(win.reward, ROUND_WIN_REWARD);
    assert_eq!(env.round_steps(), 0);
    assert_eq!(env.rounds(), 1);
    assert_eq!(env.total_steps(), 302);
    Ok(())
}

#[test]
fn progressive_reward_keeps_lost_round_penalty() -> Result<(), EnvError> {
    let mut env = ProgressiveReward::new(with_rewards(&[0.0, 0.0, -1.0, 0.0]));
    env.reset(None)?;
    env.step(0)?;
    env.step(0)?;
    assert_eq!(env.round_steps(), 2);
    assert_eq!(env.step(0)?.reward, -1.0);
    assert_eq!(env.round_steps(), 0);
    assert_eq!(env.rounds(), 1);
    let next = env.step(0)?;
    assert_eq!(next.reward, env.survival_bonus(0));
    env.reset(None)?;
    assert_eq!(env.rounds(), 0);
    assert_eq!(env.round_steps(), 0);
    assert_eq!(env.total_steps(), 4);
    assert_eq!(env.inner().resets(), 2);
    Ok(())
}

#[test]
fn channel_first_transposes_every_observation() -> Result<(), EnvError> {
    let frame = gradient(&[4, 6, 3]);
    let inner = ScriptedEnv::new(frame.clone(), vec![frame.clone()]);
    let mut env = ChannelFirst::new(inner).expect("rank 3 observations");
    assert_eq!(env.observation_space().shape, vec![3, 4, 6]);

    let reset = env.reset(None)?;
    assert_eq!(reset.observation.shape(), &[3, 4, 6]);
    let step = env.step(0)?;
    let (Observation::U8(moved), Observation::U8(source)) = (step.observation, frame) else {
        panic!("dtype changed");
    };
    assert_eq!(moved.shape(), &[3, 4, 6]);
    for c in 0..3 {
        for h in 0..4 {
            for w in 0..6 {
                assert_eq!(moved[[c, h, w]], source[[h, w, c]]);
            }
        }
    }
    Ok(())
}

#[test]
fn normalize_scales_into_unit_interval() -> Result<(), EnvError> {
    let frame = gradient(&[2, 8, 16]);
    let inner = ScriptedEnv::new(frame.clone(), vec![pixels(&[2, 8, 16], 255)]);
    let mut env = Normalize::new(inner);
    let space = env.observation_space();
    assert_eq!((space.low, space.high, space.dtype), (0.0, 1.0, Dtype::F32));

    let Observation::F32(scaled) = env.reset(None)?.observation else {
        panic!("normalize must emit floats");
    };
    let Observation::U8(raw) = frame else {
        unreachable!()
    };
    for (value, source) in scaled.iter().zip(raw.iter()) {
        assert!((0.0..=1.0).contains(value));
        assert!((value - f32::from(*source) / 255.0).abs() < 1e-6);
    }
    let Observation::F32(bright) = env.step(0)?.observation else {
        panic!("normalize must emit floats");
    };
    assert!(bright.iter().all(|value| (*value - 1.0).abs() < 1e-6));
    Ok(())
}

#[test]
fn remove_noop_shifts_actions() -> Result<(), EnvError> {
    let inner = with_rewards(&[0.0, 0.0]).with_action_count(5);
    let mut env = RemoveNoop::new(inner).expect("enough actions");
    assert_eq!(env.action_space().n, 4);
    env.reset(None)?;
    env.step(0)?;
    env.step(3)?;
    assert_eq!(env.inner().actions(), &[1, 4]);
    Ok(())
}

#[test]
fn remove_noop_rejects_actions_outside_reduced_space() -> Result<(), EnvError> {
    let inner = with_rewards(&[0.0]).with_action_count(5);
    let mut env = RemoveNoop::new(inner).expect("enough actions");
    env.reset(None)?;
    for action in [4, usize::MAX] {
        assert!(matches!(
            env.step(action),
            Err(EnvError::InvalidAction { n: 4, .. })
        ));
    }
    assert!(env.inner().actions().is_empty());
    Ok(())
}

#[test]
fn remove_noop_needs_more_than_one_action() {
    let inner = with_rewards(&[]).with_action_count(1);
    assert!(RemoveNoop::new(inner).is_err());
}

#[test]
fn skip_redundant_frames_repeats_until_change() -> Result<(), EnvError> {
    let shape = [10, 4, 3];
    let still = gradient(&shape);
    let Observation::U8(mut flicker) = still.clone() else {
        unreachable!()
    };
    flicker[[0, 0, 0]] = flicker[[0, 0, 0]].wrapping_add(1);
    flicker[[TOP_CROP - 1, 3, 2]] = flicker[[TOP_CROP - 1, 3, 2]].wrapping_add(1);
    let flicker = Observation::U8(flicker);
    let changed = pixels(&shape, 9);

    let script = vec![
        ScriptedStep::new(flicker.clone()),
        ScriptedStep::new(still.clone()),
        ScriptedStep::new(flicker),
        ScriptedStep::new(changed.clone()).with_reward(0.5),
    ];
    let mut env = SkipRedundantFrames::new(ScriptedEnv::from_steps(still, script));
    env.reset(None)?;
    let step = env.step(2)?;
    assert_eq!(step.observation, changed);
    assert_eq!(step.reward, 0.5);
    assert_eq!(env.last_repeats(), 3);
    assert_eq!(env.inner().steps_taken(), 4);
    assert_eq!(env.inner().actions(), &[2, 2, 2, 2]);
    Ok(())
}

#[test]
fn skip_redundant_frames_stops_at_episode_end() -> Result<(), EnvError> {
    let frame = gradient(&[8, 2]);
    let script = vec![
        ScriptedStep::new(frame.clone()),
        ScriptedStep::new(frame.clone()).terminated(),
        ScriptedStep::new(frame.clone()),
    ];
    let mut env = SkipRedundantFrames::new(ScriptedEnv::from_steps(frame, script));
    env.reset(None)?;
    let step = env.step(1)?;
    assert!(step.terminated);
    assert_eq!(env.inner().steps_taken(), 2);
    Ok(())
}

#[test]
fn skip_redundant_frames_honours_repeat_cap() -> Result<(), EnvError> {
    let frame = gradient(&[8, 2]);
    let script = vec![ScriptedStep::new(frame.clone()); 6];
    let mut env =
        SkipRedundantFrames::new(ScriptedEnv::from_steps(frame, script)).with_max_repeats(2);
    env.reset(None)?;
    env.step(0)?;
    assert_eq!(env.inner().steps_taken(), 3);
    Ok(())
}

#[test]
fn inner_failures_propagate_through_the_chain() -> Result<(), EnvError> {
    let mut env = with_rewards(&[0.0])
        .stop_on_round_end(1.0)
        .progressive_reward(0.01)
        .survival_reward(0.01);
    env.reset(None)?;
    env.step(0)?;
    assert!(matches!(env.step(0), Err(EnvError::Simulator(_))));
    assert!(matches!(
        env.step(99),
        Err(EnvError::InvalidAction { action: 99, .. })
    ));
    Ok(())
}

#[test]
fn wrappers_compose_through_boxed_environments() -> Result<(), EnvError> {
    let frame = gradient(&[6, 5, 3]);
    let mut env = ScriptedEnv::new(frame.clone(), vec![frame])
        .boxed()
        .channel_first()
        .expect("rank 3")
        .normalize();
    let reset = env.reset(Some(1))?;
    assert_eq!(reset.observation.shape(), &[3, 6, 5]);
    assert_eq!(reset.observation.dtype(), Dtype::F32);
    assert!(env.observation_space().contains(&reset.observation));
    Ok(())
}

fn ramp(shape: &[usize], offset: u8) -> Observation {
    let len: usize = shape.iter().product();
    let values = (0..len).map(|value| (value as u8).wrapping_add(offset)).collect();
    Observation::U8(ArrayD::from_shape_vec(IxDyn(shape), values).expect("ramp shape"))
}

#[test]
fn frame_stack_pads_with_reset_observation() -> Result<(), EnvError> {
    let env = ScriptedEnv::new(ramp(&[2, 3], 0), vec![ramp(&[2, 3], 10)]);
    let mut stacked = FrameStack::new(env, 3).expect("frame stack");
    assert_eq!(stacked.observation_space().shape, vec![3, 2, 3]);
    let reset = stacked.reset(None)?;
    assert_eq!(reset.observation.shape(), &[3, 2, 3]);
    let Observation::U8(values) = stacked.step(0)?.observation else {
        panic!("dtype changed");
    };
    assert_eq!(values[[0, 0, 0]], 0);
    assert_eq!(values[[1, 0, 0]], 0);
    assert_eq!(values[[2, 0, 0]], 10);
    Ok(())
}

#[test]
fn frame_stack_requires_reset() {
    let env = ScriptedEnv::new(ramp(&[2, 3], 0), vec![ramp(&[2, 3], 10)]);
    let mut stacked = FrameStack::new(env, 2).expect("frame stack");
    assert!(matches!(stacked.step(0), Err(EnvError::NeedsReset)));
    assert!(matches!(
        FrameStack::new(ScriptedEnv::new(ramp(&[2], 0), Vec::new()), 0),
        Err(ConfigError::NonPositive(_))
    ));
}

#[test]
fn channel_wise_stack_folds_frames_channels_last() -> Result<(), EnvError> {
    let shape = [2, 3, 2, 2];
    let env = ScriptedEnv::new(ramp(&shape, 0), Vec::new());
    let mut folded = ChannelWiseFrameStack::new(env).expect("channel-wise stack");
    assert_eq!(folded.observation_space().shape, vec![6, 2, 2]);
    let Observation::U8(values) = folded.reset(None)?.observation else {
        panic!("dtype changed");
    };
    let Observation::U8(source) = ramp(&shape, 0) else {
        unreachable!()
    };
    let expected: Vec<u8> = source
        .permuted_axes(IxDyn(&[0, 2, 3, 1]))
        .iter()
        .copied()
        .collect();
    let actual: Vec<u8> = values.iter().copied().collect();
    assert_eq!(actual, expected);
    Ok(())
}

#[test]
fn layout_wrappers_reject_wrong_rank() {
    let flat = || ScriptedEnv::new(ramp(&[2, 3], 0), Vec::new());
    assert!(matches!(
        ChannelFirst::new(flat()),
        Err(ConfigError::ObservationRank { expected: 3, .. })
    ));
    assert!(matches!(
        ChannelWiseFrameStack::new(flat()),
        Err(ConfigError::ObservationRank { expected: 4, .. })
    ));
}
