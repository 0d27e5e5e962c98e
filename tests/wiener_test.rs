// tests/wiener_test.rs
use stochdiff::math_utils::norm_cdf;
use stochdiff::rng::RngFactory;
use stochdiff::wiener::{delta_w, ikpw, iwik, jkpw, jwik, RepeatedIntegrals};

#[test]
fn test_increment_moments_match_normal_of_variance_h() {
    let h = 0.01;
    let factory = RngFactory::new(2024);
    let dw = delta_w(20_000, 1, h, &factory);

    let n = dw.len() as f64;
    let mean = dw.sum() / n;
    let variance = dw.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    assert!(mean.abs() < 0.01, "mean {}", mean);
    assert!(
        (variance - h).abs() / h < 0.05,
        "variance {} should be close to {}",
        variance,
        h
    );
}

#[test]
fn test_increment_tail_fractions() {
    // fraction of draws beyond one standard deviation matches the normal
    // CDF prediction
    let h: f64 = 0.04;
    let sd = h.sqrt();
    let factory = RngFactory::new(5);
    let dw = delta_w(20_000, 1, h, &factory);

    let beyond = dw.iter().filter(|x| x.abs() > sd).count() as f64 / dw.len() as f64;
    let expected = 2.0 * (1.0 - norm_cdf(1.0));
    assert!(
        (beyond - expected).abs() < 0.02,
        "tail fraction {} vs expected {}",
        beyond,
        expected
    );
}

#[test]
fn test_symmetric_part_identities_for_all_methods() {
    let h = 0.02;
    for m in [1usize, 2, 3] {
        let factory = RngFactory::new(77 + m as u64);
        let dw = delta_w(30, m, h, &factory);

        let tensors = [
            ("ikpw", ikpw(&dw, h, &factory), true),
            ("iwik", iwik(&dw, h, &factory), true),
            ("jkpw", jkpw(&dw, h, &factory), false),
            ("jwik", jwik(&dw, h, &factory), false),
        ];

        for (name, tensor, ito) in &tensors {
            for s in 0..30 {
                for a in 0..m {
                    for b in 0..m {
                        let sym = tensor[[s, a, b]] + tensor[[s, b, a]];
                        let mut expected = dw[[s, a]] * dw[[s, b]];
                        if *ito && a == b {
                            expected -= h;
                        }
                        assert!(
                            (sym - expected).abs() < 1e-12,
                            "{} m={} step={} ({},{})",
                            name,
                            m,
                            s,
                            a,
                            b
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_scalar_repeated_integrals_are_exact() {
    let h = 0.05;
    let factory = RngFactory::new(3);
    let dw = delta_w(100, 1, h, &factory);

    let i = ikpw(&dw, h, &factory);
    let j = jkpw(&dw, h, &factory);
    for s in 0..100 {
        let w = dw[[s, 0]];
        assert!((i[[s, 0, 0]] - 0.5 * (w * w - h)).abs() < 1e-14);
        assert!((j[[s, 0, 0]] - 0.5 * w * w).abs() < 1e-14);
    }
}

#[test]
fn test_realizations_are_reproducible_from_the_seed() {
    let h = 0.01;
    let a_factory = RngFactory::new(99);
    let b_factory = RngFactory::new(99);

    let dw_a = delta_w(64, 2, h, &a_factory);
    let dw_b = delta_w(64, 2, h, &b_factory);
    assert_eq!(dw_a, dw_b);

    assert_eq!(iwik(&dw_a, h, &a_factory), iwik(&dw_b, h, &b_factory));
    assert_eq!(jkpw(&dw_a, h, &a_factory), jkpw(&dw_b, h, &b_factory));
}

#[test]
fn test_method_selector_dispatch() {
    let h = 0.01;
    let factory = RngFactory::new(12);
    let dw = delta_w(16, 2, h, &factory);

    assert_eq!(
        RepeatedIntegrals::Kpw.ito(&dw, h, &factory),
        ikpw(&dw, h, &factory)
    );
    assert_eq!(
        RepeatedIntegrals::Wik.stratonovich(&dw, h, &factory),
        jwik(&dw, h, &factory)
    );
    assert_eq!(RepeatedIntegrals::default(), RepeatedIntegrals::Kpw);
}

#[test]
fn test_ito_and_stratonovich_differ_by_half_h_on_the_diagonal() {
    let h = 0.02;
    let factory = RngFactory::new(55);
    let dw = delta_w(25, 3, h, &factory);

    let i = ikpw(&dw, h, &factory);
    let j = jkpw(&dw, h, &factory);
    for s in 0..25 {
        for a in 0..3 {
            assert!((j[[s, a, a]] - i[[s, a, a]] - 0.5 * h).abs() < 1e-14);
        }
    }
}
