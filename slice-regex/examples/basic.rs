use slice_regex::{engine::Flags, PatternCache, Segment};

fn main() {
    let pattern = PatternCache::global()
        .get_or_compile("la vie est (drôle|belle)", Flags::IGNORE_CASE)
        .unwrap();
    let m = pattern.execute("« LA VIE EST DRÔLE »", 0);
    assert_eq!(m.get(1).as_str(), Some("DRÔLE"));

    let pattern = PatternCache::global()
        .get_or_compile(r"(\w+)@(\w+)\.com", Flags::empty())
        .unwrap();
    let input = "alice@example.com, bob@test.com";
    for segment in pattern.scan_all(input, 0, None) {
        match segment {
            Segment::Gap(gap) => println!("gap   {:?}", gap.as_str().unwrap_or_default()),
            Segment::Match(m) => println!("match {m}"),
        }
    }

    // Empty matches still make progress
    let pattern = PatternCache::global().get_or_compile("x*", Flags::empty()).unwrap();
    assert_eq!(pattern.scan_all("βίος", 0, None).match_count(), 5);
}
