//! Bucket partitioning and incremental adjacency for the factor pool.
//!
//! Each variable of the elimination order owns a bucket: the ids of the
//! pool factors whose earliest-eliminated scope variable it is. Messages
//! created during the forward pass are appended to the pool and routed to
//! the bucket of the first order-suffix variable in their scope; messages
//! whose scope has emptied are collected as roots instead and never
//! re-enter a bucket.

use smallvec::SmallVec;

use crate::factor::Factor;
use crate::model::InfluenceDiagram;

/// Index of a factor in the pool.
pub(crate) type FactorId = usize;

/// Inline capacity for bucket membership lists.
const INLINE_BUCKET_SIZE: usize = 8;

/// The growing factor pool and its bucket adjacency, owned by a single
/// solver run.
#[derive(Debug)]
pub(crate) struct BucketState {
    pool: Vec<Factor>,
    vin: Vec<SmallVec<[FactorId; INLINE_BUCKET_SIZE]>>,
    roots: Vec<FactorId>,
    input_count: usize,
}

impl BucketState {
    /// Copies the model's factors into the pool and assigns each to the
    /// bucket of its earliest scope variable in `order`. Scalar inputs have
    /// no bucket and join the roots directly.
    pub(crate) fn partition(model: &InfluenceDiagram, order: &[u32]) -> Self {
        let pool: Vec<Factor> = model.factors().to_vec();
        let mut vin = vec![SmallVec::new(); model.nvar()];
        let mut roots = Vec::new();
        let mut used = vec![false; pool.len()];

        for &x in order {
            for (id, factor) in pool.iter().enumerate() {
                if !used[id] && factor.scope().contains_index(x) {
                    vin[x as usize].push(id);
                    used[id] = true;
                }
            }
        }
        // The order covers every registered variable, so only scalar
        // inputs can be left unassigned.
        for (id, assigned) in used.iter().enumerate() {
            if !assigned {
                debug_assert!(pool[id].is_scalar());
                roots.push(id);
            }
        }

        let input_count = pool.len();
        Self {
            pool,
            vin,
            roots,
            input_count,
        }
    }

    /// Appends a message produced while eliminating the variable at
    /// position `pos` of `order`, routing it to the bucket of the first
    /// suffix variable in its scope, or to the roots. Returns its id.
    pub(crate) fn push_message(&mut self, factor: Factor, pos: usize, order: &[u32]) -> FactorId {
        let id = self.pool.len();
        let bucket = order[pos + 1..]
            .iter()
            .find(|&&y| factor.scope().contains_index(y));
        match bucket {
            Some(&y) => self.vin[y as usize].push(id),
            None => {
                debug_assert!(factor.is_scalar());
                self.roots.push(id);
            }
        }
        self.pool.push(factor);
        id
    }

    /// Ids currently assigned to the bucket of variable `x`.
    pub(crate) fn bucket(&self, x: u32) -> &[FactorId] {
        &self.vin[x as usize]
    }

    /// The pool factor with this id.
    pub(crate) fn factor(&self, id: FactorId) -> &Factor {
        &self.pool[id]
    }

    /// Ids of scalar factors collected at the roots.
    pub(crate) fn roots(&self) -> &[FactorId] {
        &self.roots
    }

    /// Number of messages appended since partitioning.
    pub(crate) fn message_count(&self) -> usize {
        self.pool.len() - self.input_count
    }

    /// Total table cells held by the pool.
    pub(crate) fn table_cells(&self) -> usize {
        self.pool.iter().map(|f| f.table().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::{Factor, FactorType};
    use crate::model::{InfluenceDiagram, VarSet};

    fn two_var_model() -> (InfluenceDiagram, Vec<u32>) {
        let mut id = InfluenceDiagram::new();
        let a = id.add_chance(2).unwrap();
        let b = id.add_chance(2).unwrap();
        id.add_probability(&[a], vec![0.2, 0.8]).unwrap();
        id.add_probability(&[a, b], vec![0.6, 0.1, 0.4, 0.9]).unwrap();
        id.add_utility(&[b], vec![1.0, 2.0]).unwrap();
        (id, vec![a.index(), b.index()])
    }

    #[test]
    fn every_input_lands_in_exactly_one_bucket() {
        let (model, order) = two_var_model();
        let state = BucketState::partition(&model, &order);
        // Both factors mentioning a go to a's bucket; the utility over b
        // goes to b's bucket.
        assert_eq!(state.bucket(0), &[0, 1]);
        assert_eq!(state.bucket(1), &[2]);
        assert!(state.roots().is_empty());
    }

    #[test]
    fn earliest_scope_variable_wins() {
        let (model, _) = two_var_model();
        let reversed = vec![1, 0];
        let state = BucketState::partition(&model, &reversed);
        // Under order [b, a] the pairwise factor and the utility go to b.
        assert_eq!(state.bucket(1), &[1, 2]);
        assert_eq!(state.bucket(0), &[0]);
    }

    #[test]
    fn scalar_inputs_become_roots() {
        let mut model = InfluenceDiagram::new();
        let a = model.add_chance(2).unwrap();
        model.add_probability(&[a], vec![0.5, 0.5]).unwrap();
        model
            .add_factor(Factor::scalar(3.0, FactorType::Utility))
            .unwrap();
        let state = BucketState::partition(&model, &[a.index()]);
        assert_eq!(state.roots(), &[1]);
        assert_eq!(state.bucket(0), &[0]);
    }

    #[test]
    fn messages_route_to_first_remaining_scope_variable() {
        let (model, order) = two_var_model();
        let mut state = BucketState::partition(&model, &order);
        let b = model.var(1).unwrap();
        let message = Factor::new(
            VarSet::singleton(b),
            vec![0.3, 0.7],
            FactorType::Probability,
        )
        .unwrap();
        let id = state.push_message(message, 0, &order);
        assert_eq!(state.bucket(1), &[2, id]);
        assert_eq!(state.message_count(), 1);
    }

    #[test]
    fn scalar_messages_become_roots() {
        let (model, order) = two_var_model();
        let mut state = BucketState::partition(&model, &order);
        let id = state.push_message(Factor::scalar(1.0, FactorType::Probability), 1, &order);
        assert_eq!(state.roots(), &[id]);
    }
}
