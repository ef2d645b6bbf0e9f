mod common;

use std::collections::VecDeque;

use common::{
    FRAME_BYTES, HEIGHT, WIDTH, encoder_params, gated_pipe, poll_until_done, request, wait_for,
};
use frame_pipe::{
    AsyncTextureEncoder, PipelineConfig, PipelineError, RingKind, TaskId, TaskState, TextureRef,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Enqueue(u8),
    Poll,
    Release,
    ClearOldest,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u8..=0xE0).prop_map(Op::Enqueue),
        3 => Just(Op::Poll),
        2 => Just(Op::Release),
        2 => Just(Op::ClearOldest),
    ]
}

fn is_encoder_overflow(state: &TaskState) -> bool {
    matches!(
        state,
        TaskState::Failed(PipelineError::ResourceExhausted {
            ring: RingKind::Encoder,
            ..
        })
    )
}

fn encoder_ring(capacity: usize) -> PipelineConfig {
    PipelineConfig {
        encoder_ring_capacity: capacity,
        ..PipelineConfig::default()
    }
}

fn submission_ring(capacity: usize) -> PipelineConfig {
    PipelineConfig {
        submission_ring_capacity: capacity,
        ..PipelineConfig::default()
    }
}

fn enqueue_direct(encoder: &AsyncTextureEncoder, texture: u32) -> Result<usize, PipelineError> {
    encoder.enqueue(TextureRef::texture_2d(texture), WIDTH, HEIGHT, false)
}

fn wait_encoded(encoder: &AsyncTextureEncoder, index: usize) {
    wait_for(|| (encoder.query(index).unwrap() != TaskState::Pending).then_some(()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn encoder_ring_admits_exactly_one_more_after_a_clear(capacity in 2usize..8) {
        let (pipe, gate) = gated_pipe(encoder_ring(capacity));
        let handle = pipe.create_async_texture_encoder(encoder_params()).unwrap();
        let instance = pipe.instance(handle).unwrap();
        let encoder = instance.as_async_texture_encoder().unwrap();
        let full = PipelineError::ResourceExhausted { ring: RingKind::Encoder, capacity };

        for index in 0..capacity - 1 {
            prop_assert_eq!(enqueue_direct(encoder, index as u32 + 1), Ok(index));
        }
        prop_assert_eq!(enqueue_direct(encoder, 0xAA), Err(full.clone()));
        prop_assert_eq!(encoder.in_flight(), capacity - 1);

        gate.send(()).unwrap();
        wait_encoded(encoder, 0);
        encoder.clear_task(0).unwrap();

        prop_assert_eq!(enqueue_direct(encoder, 0xAB), Ok(capacity - 1));
        prop_assert_eq!(enqueue_direct(encoder, 0xAC), Err(full));
        prop_assert_eq!(encoder.in_flight(), capacity - 1);
    }

    #[test]
    fn submission_ring_admits_exactly_one_more_after_a_clear(capacity in 2usize..32) {
        let (pipe, gate) = gated_pipe(submission_ring(capacity));
        let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
        let full = PipelineError::ResourceExhausted { ring: RingKind::Submission, capacity };

        let mut tasks = Vec::new();
        for n in 1..capacity as u32 {
            let task = pipe.enqueue_texture_encode(encoder, request(n)).unwrap();
            prop_assert_eq!(task.get(), n);
            tasks.push(task);
        }
        prop_assert_eq!(pipe.enqueue_texture_encode(encoder, request(0xAA)), Err(full.clone()));

        drop(gate);
        poll_until_done(&pipe, tasks[0]);
        pipe.clear_task(tasks[0]).unwrap();

        let next = pipe.enqueue_texture_encode(encoder, request(0xAB)).unwrap();
        prop_assert_eq!(next.get() as usize, capacity);
        prop_assert_eq!(pipe.enqueue_texture_encode(encoder, request(0xAC)), Err(full));
        prop_assert_eq!(pipe.submissions().in_flight(), capacity - 1);
    }

    #[test]
    fn wrapped_encoder_window_accepts_only_live_indices(
        capacity in 2usize..8,
        cycles in 0usize..20,
        extra in 0usize..8,
    ) {
        let (pipe, gate) = gated_pipe(encoder_ring(capacity));
        drop(gate);
        let handle = pipe.create_async_texture_encoder(encoder_params()).unwrap();
        let instance = pipe.instance(handle).unwrap();
        let encoder = instance.as_async_texture_encoder().unwrap();

        for cycle in 0..cycles {
            let index = enqueue_direct(encoder, cycle as u32 % 0xD0 + 1).unwrap();
            prop_assert_eq!(index, cycle % capacity);
            wait_encoded(encoder, index);
            encoder.clear_task(index).unwrap();
        }
        let live: Vec<usize> = (0..extra.min(capacity - 1))
            .map(|n| enqueue_direct(encoder, n as u32 + 1).unwrap())
            .collect();

        for index in (0..=capacity).chain([usize::MAX]) {
            let found = encoder.query(index).is_ok();
            prop_assert_eq!(found, live.contains(&index), "index {}", index);
        }
    }

    #[test]
    fn wrapped_submission_window_accepts_only_live_ids(
        capacity in 2usize..16,
        cycles in 0usize..40,
        extra in 0usize..16,
    ) {
        let (pipe, gate) = gated_pipe(submission_ring(capacity));
        drop(gate);
        let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();

        for cycle in 0..cycles {
            let task = pipe.enqueue_texture_encode(encoder, request(cycle as u32 % 0xD0 + 1)).unwrap();
            prop_assert_eq!(task.get() as usize, cycle % capacity + 1);
            poll_until_done(&pipe, task);
            pipe.clear_task(task).unwrap();
        }
        let live: Vec<u32> = (0..extra.min(capacity - 1))
            .map(|n| pipe.enqueue_texture_encode(encoder, request(n as u32 + 1)).unwrap().get())
            .collect();

        for raw in (1..=capacity as u32 + 1).chain([u32::MAX]) {
            let task = TaskId::new(raw).unwrap();
            prop_assert_eq!(pipe.query_task(task).is_ok(), live.contains(&raw), "raw id {}", raw);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn raw_ids_outside_the_window_are_rejected(
        raw in prop_oneof![Just(0u32), Just(u32::MAX), 5u32..=u32::MAX],
    ) {
        let config = PipelineConfig {
            submission_ring_capacity: 8,
            ..PipelineConfig::default()
        };
        let (pipe, _gate) = gated_pipe(config);
        let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
        for texture in 1..=4 {
            pipe.enqueue_texture_encode(encoder, request(texture)).unwrap();
        }

        match TaskId::new(raw) {
            None => prop_assert_eq!(raw, 0),
            Some(task) => {
                prop_assert_eq!(
                    pipe.query_task(task),
                    Err(PipelineError::InvalidTaskId(u64::from(raw)))
                );
                prop_assert!(pipe.clear_task(task).is_err());
            }
        }
        prop_assert_eq!(pipe.submissions().in_flight(), 4);
    }

    #[test]
    fn completion_is_always_a_prefix_of_submission_order(
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let config = PipelineConfig {
            submission_ring_capacity: 6,
            ..PipelineConfig::default()
        };
        let (pipe, gate) = gated_pipe(config);
        let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
        let mut live: VecDeque<(TaskId, u8)> = VecDeque::new();

        for op in ops {
            match op {
                Op::Enqueue(fill) => match pipe.enqueue_texture_encode(encoder, request(fill.into())) {
                    Ok(task) => live.push_back((task, fill)),
                    Err(err) => {
                        prop_assert_eq!(live.len(), 5);
                        prop_assert!(err.is_backpressure());
                    }
                },
                Op::Poll => {
                    pipe.poll_render_thread();
                }
                Op::Release => {
                    gate.send(()).unwrap();
                }
                Op::ClearOldest => {
                    if let Some(&(task, _)) = live.front() {
                        if pipe.query_task(task).unwrap() == TaskState::Pending {
                            prop_assert!(pipe.clear_task(task).is_err());
                        } else {
                            pipe.clear_task(task).unwrap();
                            live.pop_front();
                        }
                    }
                }
            }

            let states: Vec<TaskState> = live
                .iter()
                .map(|&(task, _)| pipe.query_task(task).unwrap())
                .collect();
            let done = states.iter().take_while(|s| **s != TaskState::Pending).count();
            prop_assert!(states[done..].iter().all(|s| *s == TaskState::Pending));
        }

        drop(gate);
        if let Some(&(last, _)) = live.back() {
            wait_for(|| {
                pipe.poll_render_thread();
                (pipe.query_task(last).unwrap() != TaskState::Pending).then_some(())
            });
        }
        for &(task, fill) in &live {
            let state = pipe.query_task(task).unwrap();
            if is_encoder_overflow(&state) {
                continue;
            }
            prop_assert_eq!(state, TaskState::Encoded { size: FRAME_BYTES });
            let mut out = Vec::new();
            pipe.read_task_output(task, &mut out).unwrap();
            prop_assert!(out.iter().all(|&byte| byte == fill));
        }
    }
}
