use super::*;

fn cfg(cols: u32, rows: u32) -> SheetConfig {
    let mut c = SheetConfig::default();
    c.grid.cols = cols;
    c.grid.rows_per_sheet = rows;
    c.aspect_ratio = "1".into();
    c.cell_width = 100;
    c
}

fn refs(n: usize) -> Vec<ImageRef> {
    ImageRef::list((0..n).map(|i| format!("img{i}.png")))
}

#[test]
fn total_batches_is_ceiling_division() {
    assert_eq!(total_batches(7, 1, 3), 3);
    assert_eq!(total_batches(9, 3, 3), 1);
    assert_eq!(total_batches(10, 3, 3), 2);
    assert_eq!(total_batches(0, 3, 3), 0);
}

#[test]
fn seven_images_two_rows_three_cols() {
    let plan = BatchPlan::new(&refs(7), &cfg(3, 2), BatchMode::Normal).unwrap();
    assert_eq!(plan.total_batches(), 2);
    let b = plan.batches();
    assert_eq!(b[0].range, 0..6);
    assert_eq!(b[0].grid.rows, 2);
    assert_eq!((b[0].first_number, b[0].last_number), (1, 6));
    assert_eq!(b[1].range, 6..7);
    assert_eq!(b[1].grid.rows, 1);
    assert_eq!(b[1].first_number, 7);
    assert_eq!(plan.batch_images(1)[0].source, "img6.png");
    assert!(plan.batch_images(5).is_empty());
}

#[test]
fn last_sheet_rows_shrink_to_content() {
    let plan = BatchPlan::new(&refs(7), &cfg(3, 3), BatchMode::Normal).unwrap();
    assert_eq!(plan.total_batches(), 1);
    assert_eq!(plan.batches()[0].grid.rows, 3);

    let plan = BatchPlan::new(&refs(4), &cfg(3, 3), BatchMode::Normal).unwrap();
    assert_eq!(plan.batches()[0].grid.rows, 2);
}

#[test]
fn repack_drops_targets_and_renumbers() {
    let mut c = cfg(3, 3);
    c.grid.start_number = 10;
    c.redaction.targets = "11, 13".into();

    let plan = BatchPlan::new(&refs(5), &c, BatchMode::Repack).unwrap();
    assert_eq!(plan.removed(), 2);
    let kept: Vec<_> = plan.images().iter().map(|r| r.ordinal).collect();
    assert_eq!(kept, vec![0, 2, 4]);
    assert_eq!(
        (plan.batches()[0].first_number, plan.batches()[0].last_number),
        (10, 12)
    );

    let normal = BatchPlan::new(&refs(5), &c, BatchMode::Normal).unwrap();
    assert_eq!(normal.images().len(), 5);
}

#[test]
fn repack_of_everything_and_empty_input_fail_up_front() {
    let mut c = cfg(3, 3);
    c.redaction.targets = "1-3".into();
    let err = BatchPlan::new(&refs(3), &c, BatchMode::Repack).unwrap_err();
    assert!(err.is_precondition());
    assert!(BatchPlan::new(&[], &c, BatchMode::Normal).unwrap_err().is_precondition());
}

#[test]
fn redaction_activity_per_mode() {
    let mut c = cfg(3, 3);
    assert!(!BatchMode::Normal.redaction_active(&c));
    assert!(BatchMode::Apply.redaction_active(&c));
    assert!(!BatchMode::Repack.redaction_active(&c));
    c.redaction.enabled = true;
    assert!(BatchMode::Normal.redaction_active(&c));
    assert!(!BatchMode::Repack.redaction_active(&c));
}

#[test]
fn repack_helper_uses_start_number() {
    let mask = MaskIndexSet::parse("1");
    assert_eq!(repack(&refs(3), 1, &mask).len(), 2);
    assert_eq!(repack(&refs(3), 2, &mask).len(), 3);
}

#[test]
fn balanced_chunking_spreads_seven_images_as_three_and_four() {
    let mut c = cfg(3, 2);
    c.grid.chunking = Chunking::Balanced;
    let plan = BatchPlan::new(&refs(7), &c, BatchMode::Normal).unwrap();
    assert_eq!(plan.total_batches(), 2);
    let b = plan.batches();
    assert_eq!((b[0].len(), b[0].grid.rows), (3, 1));
    assert_eq!((b[1].len(), b[1].grid.rows), (4, 2));
    assert_eq!((b[1].first_number, b[1].last_number), (4, 7));
}

#[test]
fn batch_sizes_cover_every_image_once() {
    for n in 1..40usize {
        for per in 1..10usize {
            for chunking in [Chunking::Fixed, Chunking::Balanced] {
                let sizes = batch_sizes(n, per, chunking);
                assert_eq!(sizes.len(), n.div_ceil(per));
                assert_eq!(sizes.iter().sum::<usize>(), n);
                assert!(sizes.iter().all(|&s| s >= 1 && s <= per));
            }
        }
    }
    assert_eq!(batch_sizes(7, 6, Chunking::Fixed), vec![6, 1]);
    assert_eq!(batch_sizes(7, 6, Chunking::Balanced), vec![3, 4]);
}

#[test]
fn sheets_taller_than_the_encoder_limit_are_rejected_up_front() {
    let mut c = cfg(1, 3300);
    c.aspect_ratio = "0.5".into();
    c.cell_width = 10;
    let err = BatchPlan::new(&refs(3300), &c, BatchMode::Normal).unwrap_err();
    assert!(err.is_precondition(), "{err}");
    assert!(err.to_string().contains("batch 0"), "{err}");

    // The same rows fit once the sheet is only partly filled.
    assert!(BatchPlan::new(&refs(3000), &c, BatchMode::Normal).is_ok());
}

#[test]
fn oversized_gap_is_a_precondition_failure() {
    let mut c = cfg(3, 2);
    c.gap = u32::MAX / 2;
    let err = BatchPlan::new(&refs(6), &c, BatchMode::Normal).unwrap_err();
    assert!(err.is_precondition(), "{err}");
}
