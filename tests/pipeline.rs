mod common;

use common::{FRAME_BYTES, encoder_params, gated_pipe, poll_until_done, request, wait_for};
use frame_pipe::{
    GpuError, PipelineConfig, PipelineError, ProtocolViolation, RingKind, TaskId, TaskState,
};

#[test]
fn texture_round_trip_through_both_rings() {
    let (pipe, gate) = gated_pipe(PipelineConfig::default());
    drop(gate);
    let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();

    let first = pipe.enqueue_texture_encode(encoder, request(0x21)).unwrap();
    let second = pipe.enqueue_texture_encode(encoder, request(0x42)).unwrap();
    assert_eq!((first.get(), second.get()), (1, 2));
    assert_eq!(pipe.query_task(first), Ok(TaskState::Pending));

    assert_eq!(
        poll_until_done(&pipe, second),
        TaskState::Encoded { size: FRAME_BYTES }
    );
    for (task, fill) in [(first, 0x21), (second, 0x42)] {
        let mut out = Vec::new();
        assert_eq!(pipe.read_task_output(task, &mut out), Ok(FRAME_BYTES));
        assert!(out.iter().all(|&byte| byte == fill));
        pipe.clear_task(task).unwrap();
    }
    assert_eq!(pipe.submissions().in_flight(), 0);
    assert_eq!(
        pipe.with_async_texture_encoder(encoder, |encoder| encoder.in_flight()),
        Ok(0)
    );
}

#[test]
fn full_submission_ring_pushes_back_on_the_caller() {
    let config = PipelineConfig {
        submission_ring_capacity: 4,
        ..PipelineConfig::default()
    };
    let (pipe, gate) = gated_pipe(config);
    let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();

    for texture in 1..=3 {
        pipe.enqueue_texture_encode(encoder, request(texture)).unwrap();
    }
    let err = pipe
        .enqueue_texture_encode(encoder, request(4))
        .unwrap_err();
    assert!(err.is_backpressure());
    assert_eq!(
        err,
        PipelineError::ResourceExhausted {
            ring: RingKind::Submission,
            capacity: 4
        }
    );

    drop(gate);
    let first = TaskId::new(1).unwrap();
    poll_until_done(&pipe, first);
    pipe.clear_task(first).unwrap();
    assert_eq!(
        pipe.enqueue_texture_encode(encoder, request(4)).map(TaskId::get),
        Ok(4)
    );
}

#[test]
fn full_encoder_ring_fails_the_task_in_order() {
    let (pipe, gate) = gated_pipe(PipelineConfig::default());
    let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
    let tasks: Vec<TaskId> = (1..=4)
        .map(|texture| pipe.enqueue_texture_encode(encoder, request(texture)).unwrap())
        .collect();

    let stats = pipe.poll_render_thread();
    assert_eq!(stats.submitted, 4);
    assert_eq!(stats.completed, 0);
    for &task in &tasks {
        assert_eq!(pipe.query_task(task), Ok(TaskState::Pending));
    }

    drop(gate);
    poll_until_done(&pipe, tasks[3]);
    let overflow = TaskState::Failed(PipelineError::ResourceExhausted {
        ring: RingKind::Encoder,
        capacity: 3,
    });
    let states: Vec<TaskState> = tasks.iter().map(|&t| pipe.query_task(t).unwrap()).collect();
    assert_eq!(
        states,
        [
            TaskState::Encoded { size: FRAME_BYTES },
            TaskState::Encoded { size: FRAME_BYTES },
            overflow.clone(),
            overflow,
        ]
    );
}

#[test]
fn gpu_failure_surfaces_as_a_failed_task() {
    let (pipe, gate) = gated_pipe(PipelineConfig::default());
    drop(gate);
    let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
    let task = pipe.enqueue_texture_encode(encoder, request(0)).unwrap();
    assert_eq!(
        poll_until_done(&pipe, task),
        TaskState::Failed(GpuError::InvalidTexture(0).into())
    );

    let message = pipe
        .inspect_task(task, |view| match view {
            frame_pipe::TaskView::Failed { message, .. } => {
                message.map(|m| m.to_string_lossy().into_owned())
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(message.as_deref(), Some("texture 0 is not a valid 2D texture"));

    let mut out = vec![1, 2, 3];
    assert_eq!(
        pipe.read_task_output(task, &mut out),
        Err(GpuError::InvalidTexture(0).into())
    );
    pipe.clear_task(task).unwrap();
}

#[test]
fn clear_violations_are_rejected_without_side_effects() {
    let (pipe, gate) = gated_pipe(PipelineConfig::default());
    let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
    let first = pipe.enqueue_texture_encode(encoder, request(1)).unwrap();
    let second = pipe.enqueue_texture_encode(encoder, request(2)).unwrap();
    pipe.poll_render_thread();

    assert_eq!(
        pipe.clear_task(first),
        Err(ProtocolViolation::NotDone { index: 1 }.into())
    );
    assert_eq!(
        pipe.read_task_output(first, &mut Vec::new()),
        Err(ProtocolViolation::NotDone { index: 1 }.into())
    );

    drop(gate);
    poll_until_done(&pipe, second);
    assert_eq!(
        pipe.clear_task(second),
        Err(ProtocolViolation::OutOfOrderClear {
            expected: 1,
            got: 2
        }
        .into())
    );
    assert_eq!(pipe.submissions().in_flight(), 2);

    pipe.clear_task(first).unwrap();
    pipe.clear_task(second).unwrap();
    assert_eq!(
        pipe.query_task(second),
        Err(PipelineError::InvalidTaskId(2))
    );
}

#[test]
fn reset_discards_everything_and_rewinds_ids() {
    let (pipe, gate) = gated_pipe(PipelineConfig::default());
    let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
    for texture in 1..=2 {
        pipe.enqueue_texture_encode(encoder, request(texture)).unwrap();
    }
    pipe.poll_render_thread();
    pipe.enqueue_texture_encode(encoder, request(3)).unwrap();

    assert_eq!(pipe.reset_encode_tasks(), Ok(3));
    assert_eq!(pipe.submissions().in_flight(), 0);
    for raw in 1..=3 {
        assert_eq!(
            pipe.query_task(TaskId::new(raw).unwrap()),
            Err(PipelineError::InvalidTaskId(u64::from(raw)))
        );
    }

    drop(gate);
    wait_for(|| (pipe.poll_render_thread().orphans_remaining == 0).then_some(()));
    let task = pipe.enqueue_texture_encode(encoder, request(7)).unwrap();
    assert_eq!(task.get(), 1);
    assert_eq!(
        poll_until_done(&pipe, task),
        TaskState::Encoded { size: FRAME_BYTES }
    );
}

#[test]
fn oversized_request_is_reported_per_task() {
    let (pipe, gate) = gated_pipe(PipelineConfig::default());
    drop(gate);
    let encoder = pipe.create_async_texture_encoder(encoder_params()).unwrap();
    let mut oversized = request(5);
    oversized.width = common::WIDTH * 2;
    let task = pipe.enqueue_texture_encode(encoder, oversized).unwrap();
    assert!(matches!(
        poll_until_done(&pipe, task),
        TaskState::Failed(PipelineError::InvalidArgument(_))
    ));
}
