pub fn indicies_to_flags(indicies: &[usize], len: usize) -> Vec<bool> {
  let mut flags = vec![false; len];
  indicies.iter().for_each(|&i| flags[i] = true);
  flags
}

pub fn flags_to_indicies(flags: &[bool]) -> Vec<usize> {
  flags
    .iter()
    .enumerate()
    .filter_map(|(i, &flag)| flag.then_some(i))
    .collect()
}

pub fn sparse_to_dense_data<T>(sparse: Vec<(usize, T)>, len: usize) -> Vec<Option<T>> {
  let mut dense = Vec::from_iter((0..len).map(|_| None));
  sparse.into_iter().for_each(|(i, t)| dense[i] = Some(t));
  dense
}

pub fn dense_to_sparse_data<T>(dense: Vec<Option<T>>) -> Vec<(usize, T)> {
  dense
    .into_iter()
    .enumerate()
    .filter_map(|(i, o)| o.map(|v| (i, v)))
    .collect()
}

#[cfg(test)]
pub fn assert_mat_eq(a: &na::DMatrix<f64>, b: &na::DMatrix<f64>) {
  const TOL: f64 = 10e-12;
  let diff = a - b;
  let error = diff.norm();
  let equal = error <= TOL;
  if !equal {
    println!("Matrix a={a:.3}");
    println!("Matrix b={b:.3}");
    println!("a-b={diff:.3}");
    panic!("Matrices not equal.");
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn flags_roundtrip_keeps_order() {
    let flags = indicies_to_flags(&[4, 1], 6);
    assert_eq!(flags, vec![false, true, false, false, true, false]);
    assert_eq!(flags_to_indicies(&flags), vec![1, 4]);
  }

  #[test]
  fn dense_data_drops_holes() {
    let dense = sparse_to_dense_data(vec![(2, 'a'), (0, 'b')], 3);
    assert_eq!(dense, vec![Some('b'), None, Some('a')]);
    assert_eq!(dense_to_sparse_data(dense), vec![(0, 'b'), (2, 'a')]);
  }
}
