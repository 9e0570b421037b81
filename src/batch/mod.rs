//! Embarrassingly parallel parameter sweeps: each entry builds and runs a
//! fully isolated simulation, there is no coordination or shared mutable
//! state between runs. Cluster level scheduling stays out of scope; this
//! is a process local worker pool.

use rayon::prelude::*;


/// Runs one independent job per parameter entry in parallel and returns
/// the results in input order
pub fn run_sweep<P, T, F>(parameters: Vec<P>, runner: F) -> Vec<T>
where
    P: Send,
    T: Send,
    F: Fn(P) -> T + Sync + Send,
{
    parameters.into_par_iter().map(runner).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_preserves_input_order() {
        let results = run_sweep((0..64).collect(), |i: i32| i * i);

        assert_eq!(results.len(), 64);
        for (i, value) in results.iter().enumerate() {
            assert_eq!(*value, (i * i) as i32);
        }
    }
}
