/// Estimate the VRAM (in GiB) a generation request will need, based on a
/// static table keyed by model-id prefix. Falls back to a conservative
/// per-job-type default when the model id doesn't match a known prefix.
pub fn estimate_vram_gb(model_id: &str, job_type: crate::JobType) -> f64 {
    const TABLE: &[(&str, f64)] = &[
        ("sdxl", 8.0),
        ("sd1.5", 4.0),
        ("sd-1.5", 4.0),
        ("flux-schnell", 12.0),
        ("flux.1-schnell", 12.0),
        ("flux-dev", 24.0),
        ("flux.1-dev", 24.0),
        ("video-t2v", 8.0),
        ("svd-xt", 24.0),
    ];

    let lower = model_id.to_ascii_lowercase();
    for (prefix, gb) in TABLE {
        if lower.contains(prefix) {
            return *gb;
        }
    }

    match job_type {
        crate::JobType::Image => 6.0,
        crate::JobType::Video => 8.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobType;

    #[test]
    fn known_prefixes_match() {
        assert_eq!(estimate_vram_gb("stabilityai/sdxl-base-1.0", JobType::Image), 8.0);
        assert_eq!(estimate_vram_gb("black-forest-labs/FLUX.1-dev", JobType::Image), 24.0);
    }

    #[test]
    fn unknown_model_falls_back_by_job_type() {
        assert_eq!(estimate_vram_gb("some/unknown-model", JobType::Image), 6.0);
        assert_eq!(estimate_vram_gb("some/unknown-model", JobType::Video), 8.0);
    }
}
