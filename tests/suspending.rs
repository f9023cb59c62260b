use fanout::{FaultKind, Invoker};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// Later functions finish first.
fn square_plus() -> Vec<Box<dyn FnOnce(&i64, &i64) -> i64 + Send>> {
    (0..12i64)
        .map(|i| -> Box<dyn FnOnce(&i64, &i64) -> i64 + Send> {
            Box::new(move |o: &i64, s: &i64| {
                thread::sleep(Duration::from_millis(((12 - i) * 2) as u64));
                i * i * s + o
            })
        })
        .collect()
}

#[tokio::test]
async fn blocking_and_suspending_forms_agree() {
    let invoker = Invoker::with_workers(3).unwrap();
    let offset = 7i64;
    let scale = 3i64;

    let blocking = invoker
        .collect2(&offset, &scale, square_plus())
        .unwrap();
    let suspending = invoker
        .collect2_async(offset, scale, square_plus())
        .await
        .unwrap();

    assert_eq!(blocking, suspending);
    assert_eq!(blocking[11], 11 * 11 * 3 + 7);
}

#[tokio::test]
async fn suspending_form_leaves_runtime_free() {
    let invoker = Invoker::with_workers(2).unwrap();
    let ticks = Arc::new(AtomicUsize::new(0));

    let funcs: Vec<_> = (0..4u64)
        .map(|i| {
            move || {
                thread::sleep(Duration::from_millis(150));
                i
            }
        })
        .collect();

    let batch = {
        let ticks = Arc::clone(&ticks);
        async move {
            let values = invoker.collect_async(funcs).await;
            (values, ticks.load(Ordering::SeqCst))
        }
    };
    let ticker = {
        let ticks = Arc::clone(&ticks);
        async move {
            for _ in 0..5 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ticks.fetch_add(1, Ordering::SeqCst);
            }
        }
    };

    // Current thread runtime can only tick while the batch is suspended.
    let ((values, ticks_at_completion), ()) = tokio::join!(batch, ticker);
    assert_eq!(values.unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(ticks_at_completion, 5);
}

#[tokio::test]
async fn suspending_procedures_and_faults() {
    let invoker = Invoker::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let procs: Vec<_> = (0..5usize)
        .map(|i| {
            let counter = Arc::clone(&counter);
            move |step: &usize| {
                if i == 3 {
                    panic!("step {} refused", i);
                }
                counter.fetch_add(*step, Ordering::SeqCst);
            }
        })
        .collect();

    let error = invoker.invoke1_async(10usize, procs).await.unwrap_err();
    let faults = error.faults().unwrap();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].index(), 3);
    assert_eq!(faults[0].kind(), FaultKind::Panicked);
    assert_eq!(counter.load(Ordering::SeqCst), 40);

    let funcs: Vec<_> = (0..3u8)
        .map(|i| move || if i == 0 { Err("zero") } else { Ok(i) })
        .collect();
    let error = invoker.try_collect_async(funcs).await.unwrap_err();
    assert_eq!(error.faults().unwrap()[0].message(), "zero");

    let funcs: Vec<fn(&usize) -> usize> = vec![|x| x + 1, |x| x * 2];
    let values = invoker.collect1_async(None, funcs).await;
    assert!(values.unwrap_err().is_invalid_argument());
}
