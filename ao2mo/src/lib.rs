pub mod config;
pub mod eri;
pub mod error;
pub mod pack;
pub mod symmetry;
pub mod transform;

pub mod testing {
    //! Synthetic inputs shared by unit tests and benches.

    use crate::eri::{AoEri, AoStorage};
    use crate::pack::{pair_count, split_index};

    /// Build a packed AO tensor from a generator over canonical index
    /// quadruples. The generator is called once per unique `(pq, rs)` pair
    /// with `pq >= rs`, so the full 8-fold physical symmetry holds by
    /// construction in either storage.
    pub fn synthetic_eri(
        nao: usize,
        storage: AoStorage,
        mut f: impl FnMut(usize, usize, usize, usize) -> f64,
    ) -> AoEri {
        let npair = pair_count(nao);
        let mut packed = Vec::with_capacity(pair_count(npair));
        for pq in 0..npair {
            let (p, q) = split_index(pq);
            for rs in 0..=pq {
                let (r, s) = split_index(rs);
                packed.push(f(p, q, r, s));
            }
        }

        let data = match storage {
            AoStorage::EightFold => packed,
            AoStorage::FourFold => {
                let at = |pq: usize, rs: usize| {
                    if pq >= rs {
                        packed[pq * (pq + 1) / 2 + rs]
                    } else {
                        packed[rs * (rs + 1) / 2 + pq]
                    }
                };
                let mut expanded = vec![0.0; npair * npair];
                for pq in 0..npair {
                    for rs in 0..npair {
                        expanded[pq * npair + rs] = at(pq, rs);
                    }
                }
                expanded
            }
        };

        AoEri::new(data, nao).expect("packed size is consistent by construction")
    }
}
