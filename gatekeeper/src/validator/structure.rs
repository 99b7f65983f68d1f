//! Structural check: the artifact must look like an Angular component file.

struct Marker {
    /// Any of these substrings satisfies the marker
    needles: &'static [&'static str],
    error: &'static str,
}

const MARKERS: &[Marker] = &[
    Marker {
        needles: &["@Component"],
        error: "Angular: Missing @Component decorator",
    },
    Marker {
        needles: &["template", "templateUrl"],
        error: "Angular: Component missing template or templateUrl",
    },
    Marker {
        needles: &["export class"],
        error: "Angular: Missing exported class declaration",
    },
    Marker {
        needles: &["import"],
        error: "Angular: Missing import statements",
    },
];

pub fn check_structure(code: &str) -> Vec<String> {
    MARKERS
        .iter()
        .filter(|m| !m.needles.iter().any(|n| code.contains(n)))
        .map(|m| m.error.to_string())
        .collect()
}
