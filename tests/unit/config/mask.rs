use super::*;

fn set(expr: &str) -> Vec<u32> {
    MaskIndexSet::parse(expr).iter().collect()
}

#[test]
fn parses_numbers_and_ranges() {
    assert_eq!(set("1-3,5"), vec![1, 2, 3, 5]);
    assert_eq!(set("1, 3-5，8"), vec![1, 3, 4, 5, 8]);
}

#[test]
fn reversed_range_normalizes() {
    assert_eq!(set("5-3"), vec![3, 4, 5]);
    assert_eq!(set("9~7"), vec![7, 8, 9]);
}

#[test]
fn malformed_tokens_are_dropped() {
    assert_eq!(set("a,1,,2"), vec![1, 2]);
    assert_eq!(set("x-3, 4-y, -, 7-"), Vec::<u32>::new());
    assert_eq!(set("-2"), Vec::<u32>::new());
    assert!(MaskIndexSet::parse("").is_empty());
    assert!(MaskIndexSet::parse("   ,，、  ").is_empty());
}

#[test]
fn accepts_all_separator_variants() {
    assert_eq!(set("1、2 3\t4\n5"), vec![1, 2, 3, 4, 5]);
    assert_eq!(set("1—2,4–5,7~8"), vec![1, 2, 4, 5, 7, 8]);
    assert_eq!(set(" 10 - 12 "), vec![10, 12]);
    assert_eq!(set("10-12"), vec![10, 11, 12]);
}

#[test]
fn overlapping_ranges_merge() {
    let m = MaskIndexSet::parse("1-4,3-6,8,7");
    assert_eq!(m.len(), 8);
    assert_eq!(m.to_expression(), "1-8");
}

#[test]
fn contains_checks_every_range() {
    let m = MaskIndexSet::parse("2,4-6,100-200");
    for n in [2, 4, 5, 6, 100, 150, 200] {
        assert!(m.contains(n), "{n}");
    }
    for n in [0, 1, 3, 7, 99, 201] {
        assert!(!m.contains(n), "{n}");
    }
}

#[test]
fn wide_ranges_stay_compact() {
    let m = MaskIndexSet::parse("1-4000000000");
    assert_eq!(m.len(), 4_000_000_000);
    assert!(m.contains(3_999_999_999));
}

#[test]
fn canonical_expression_is_a_fixed_point() {
    for expr in ["1-3,5", "5-3", "a,1,,2", "9, 10, 11, 40~38, 2", "", "7,8"] {
        let once = MaskIndexSet::parse(expr);
        let twice = MaskIndexSet::parse(&once.to_expression());
        assert_eq!(once, twice, "{expr}");
    }
    assert_eq!(MaskIndexSet::parse("8,7").to_expression(), "7,8");
}

#[test]
fn collects_from_numbers() {
    let m: MaskIndexSet = [5, 1, 2, 3].into_iter().collect();
    assert_eq!(m.to_string(), "1-3,5");
}
