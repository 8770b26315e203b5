//! Static topology of the cuboid skeleton.
//!
//! Each table maps a handle to the coordinates it drags along. Entries are
//! pure data; the solver in the draft only walks them.

use super::{Corner, CuboidEdge, CuboidHandle, CuboidVertex, Plane};

/// Which coordinate of a target point follows the dragged value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    XY,
}

/// A point of the skeleton: a vertex, or one endpoint of an edge or a
/// front-to-back connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Vertex(CuboidVertex),
    Edge(CuboidEdge),
    Connector(Corner),
}

/// One co-update: write `field` of the dragged value into endpoint `index`
/// of `target` (always 0 for vertices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affect {
    pub target: Part,
    pub index: usize,
    pub field: Field,
}

const fn v(vertex: CuboidVertex, field: Field) -> Affect {
    Affect {
        target: Part::Vertex(vertex),
        index: 0,
        field,
    }
}

const fn e(edge: CuboidEdge, index: usize, field: Field) -> Affect {
    Affect {
        target: Part::Edge(edge),
        index,
        field,
    }
}

const fn c(corner: Corner, index: usize, field: Field) -> Affect {
    Affect {
        target: Part::Connector(corner),
        index,
        field,
    }
}

use super::CuboidEdge as E;
use super::CuboidVertex as V;
use self::Field::{X, XY, Y};

const FRONT_TL: &[Affect] = &[
    v(V::FrontTl, XY),
    v(V::FrontTr, Y),
    v(V::FrontBl, X),
    e(E::FrontTop, 0, XY),
    e(E::FrontTop, 1, Y),
    e(E::FrontLeft, 0, XY),
    e(E::FrontLeft, 1, X),
    e(E::FrontRight, 0, Y),
    e(E::FrontBottom, 0, X),
    c(Corner::Tl, 0, XY),
    c(Corner::Tr, 0, Y),
    c(Corner::Bl, 0, X),
];

const FRONT_TR: &[Affect] = &[
    v(V::FrontTr, XY),
    v(V::FrontTl, Y),
    v(V::FrontBr, X),
    e(E::FrontTop, 1, XY),
    e(E::FrontTop, 0, Y),
    e(E::FrontRight, 0, XY),
    e(E::FrontRight, 1, X),
    e(E::FrontLeft, 0, Y),
    e(E::FrontBottom, 1, X),
    c(Corner::Tr, 0, XY),
    c(Corner::Tl, 0, Y),
    c(Corner::Br, 0, X),
];

const FRONT_BR: &[Affect] = &[
    v(V::FrontBr, XY),
    v(V::FrontBl, Y),
    v(V::FrontTr, X),
    e(E::FrontBottom, 1, XY),
    e(E::FrontBottom, 0, Y),
    e(E::FrontRight, 1, XY),
    e(E::FrontRight, 0, X),
    e(E::FrontLeft, 1, Y),
    e(E::FrontTop, 1, X),
    c(Corner::Br, 0, XY),
    c(Corner::Bl, 0, Y),
    c(Corner::Tr, 0, X),
];

const FRONT_BL: &[Affect] = &[
    v(V::FrontBl, XY),
    v(V::FrontBr, Y),
    v(V::FrontTl, X),
    e(E::FrontBottom, 0, XY),
    e(E::FrontBottom, 1, Y),
    e(E::FrontLeft, 1, XY),
    e(E::FrontLeft, 0, X),
    e(E::FrontRight, 1, Y),
    e(E::FrontTop, 0, X),
    c(Corner::Bl, 0, XY),
    c(Corner::Br, 0, Y),
    c(Corner::Tl, 0, X),
];

const BACK_TL: &[Affect] = &[
    v(V::BackTl, XY),
    v(V::BackTr, Y),
    v(V::BackBl, X),
    e(E::BackTop, 0, XY),
    e(E::BackTop, 1, Y),
    e(E::BackLeft, 0, XY),
    e(E::BackLeft, 1, X),
    e(E::BackRight, 0, Y),
    e(E::BackBottom, 0, X),
    c(Corner::Tl, 1, XY),
    c(Corner::Tr, 1, Y),
    c(Corner::Bl, 1, X),
];

const BACK_TR: &[Affect] = &[
    v(V::BackTr, XY),
    v(V::BackTl, Y),
    v(V::BackBr, X),
    e(E::BackTop, 1, XY),
    e(E::BackTop, 0, Y),
    e(E::BackRight, 0, XY),
    e(E::BackRight, 1, X),
    e(E::BackLeft, 0, Y),
    e(E::BackBottom, 1, X),
    c(Corner::Tr, 1, XY),
    c(Corner::Tl, 1, Y),
    c(Corner::Br, 1, X),
];

const BACK_BR: &[Affect] = &[
    v(V::BackBr, XY),
    v(V::BackBl, Y),
    v(V::BackTr, X),
    e(E::BackBottom, 1, XY),
    e(E::BackBottom, 0, Y),
    e(E::BackRight, 1, XY),
    e(E::BackRight, 0, X),
    e(E::BackLeft, 1, Y),
    e(E::BackTop, 1, X),
    c(Corner::Br, 1, XY),
    c(Corner::Bl, 1, Y),
    c(Corner::Tr, 1, X),
];

const BACK_BL: &[Affect] = &[
    v(V::BackBl, XY),
    v(V::BackBr, Y),
    v(V::BackTl, X),
    e(E::BackBottom, 0, XY),
    e(E::BackBottom, 1, Y),
    e(E::BackLeft, 1, XY),
    e(E::BackLeft, 0, X),
    e(E::BackRight, 1, Y),
    e(E::BackTop, 0, X),
    c(Corner::Bl, 1, XY),
    c(Corner::Br, 1, Y),
    c(Corner::Tl, 1, X),
];

const FRONT_TOP: &[Affect] = &[
    v(V::FrontTl, Y),
    v(V::FrontTr, Y),
    e(E::FrontTop, 0, Y),
    e(E::FrontTop, 1, Y),
    e(E::FrontLeft, 0, Y),
    e(E::FrontRight, 0, Y),
    c(Corner::Tl, 0, Y),
    c(Corner::Tr, 0, Y),
];

const FRONT_BOTTOM: &[Affect] = &[
    v(V::FrontBl, Y),
    v(V::FrontBr, Y),
    e(E::FrontBottom, 0, Y),
    e(E::FrontBottom, 1, Y),
    e(E::FrontLeft, 1, Y),
    e(E::FrontRight, 1, Y),
    c(Corner::Bl, 0, Y),
    c(Corner::Br, 0, Y),
];

const FRONT_LEFT: &[Affect] = &[
    v(V::FrontTl, X),
    v(V::FrontBl, X),
    e(E::FrontLeft, 0, X),
    e(E::FrontLeft, 1, X),
    e(E::FrontTop, 0, X),
    e(E::FrontBottom, 0, X),
    c(Corner::Tl, 0, X),
    c(Corner::Bl, 0, X),
];

const FRONT_RIGHT: &[Affect] = &[
    v(V::FrontTr, X),
    v(V::FrontBr, X),
    e(E::FrontRight, 0, X),
    e(E::FrontRight, 1, X),
    e(E::FrontTop, 1, X),
    e(E::FrontBottom, 1, X),
    c(Corner::Tr, 0, X),
    c(Corner::Br, 0, X),
];

const BACK_TOP: &[Affect] = &[
    v(V::BackTl, Y),
    v(V::BackTr, Y),
    e(E::BackTop, 0, Y),
    e(E::BackTop, 1, Y),
    e(E::BackLeft, 0, Y),
    e(E::BackRight, 0, Y),
    c(Corner::Tl, 1, Y),
    c(Corner::Tr, 1, Y),
];

const BACK_LEFT: &[Affect] = &[
    v(V::BackTl, X),
    v(V::BackBl, X),
    e(E::BackLeft, 0, X),
    e(E::BackLeft, 1, X),
    e(E::BackTop, 0, X),
    e(E::BackBottom, 0, X),
    c(Corner::Tl, 1, X),
    c(Corner::Bl, 1, X),
];

const BACK_RIGHT: &[Affect] = &[
    v(V::BackTr, X),
    v(V::BackBr, X),
    e(E::BackRight, 0, X),
    e(E::BackRight, 1, X),
    e(E::BackTop, 1, X),
    e(E::BackBottom, 1, X),
    c(Corner::Tr, 1, X),
    c(Corner::Br, 1, X),
];

/// Handle -> co-updated skeleton points. The back-bottom edge is not
/// draggable and has no entry.
pub static HANDLE_RELATIONS: &[(CuboidHandle, &[Affect])] = &[
    (CuboidHandle::Vertex(V::FrontTl), FRONT_TL),
    (CuboidHandle::Vertex(V::FrontTr), FRONT_TR),
    (CuboidHandle::Vertex(V::FrontBr), FRONT_BR),
    (CuboidHandle::Vertex(V::FrontBl), FRONT_BL),
    (CuboidHandle::Vertex(V::BackTl), BACK_TL),
    (CuboidHandle::Vertex(V::BackTr), BACK_TR),
    (CuboidHandle::Vertex(V::BackBr), BACK_BR),
    (CuboidHandle::Vertex(V::BackBl), BACK_BL),
    (CuboidHandle::Edge(E::FrontTop), FRONT_TOP),
    (CuboidHandle::Edge(E::FrontBottom), FRONT_BOTTOM),
    (CuboidHandle::Edge(E::FrontLeft), FRONT_LEFT),
    (CuboidHandle::Edge(E::FrontRight), FRONT_RIGHT),
    (CuboidHandle::Edge(E::BackTop), BACK_TOP),
    (CuboidHandle::Edge(E::BackLeft), BACK_LEFT),
    (CuboidHandle::Edge(E::BackRight), BACK_RIGHT),
];

/// Edge -> its two vertices.
pub static SKELETON_EDGES: [(CuboidEdge, [CuboidVertex; 2]); 8] = [
    (E::FrontTop, [V::FrontTl, V::FrontTr]),
    (E::FrontRight, [V::FrontTr, V::FrontBr]),
    (E::FrontBottom, [V::FrontBl, V::FrontBr]),
    (E::FrontLeft, [V::FrontTl, V::FrontBl]),
    (E::BackTop, [V::BackTl, V::BackTr]),
    (E::BackRight, [V::BackTr, V::BackBr]),
    (E::BackBottom, [V::BackBl, V::BackBr]),
    (E::BackLeft, [V::BackTl, V::BackBl]),
];

/// Connector -> front vertex, back vertex.
pub static SKELETON_CONNECTORS: [(Corner, [CuboidVertex; 2]); 4] = [
    (Corner::Tl, [V::FrontTl, V::BackTl]),
    (Corner::Tr, [V::FrontTr, V::BackTr]),
    (Corner::Br, [V::FrontBr, V::BackBr]),
    (Corner::Bl, [V::FrontBl, V::BackBl]),
];

/// Vertical side of a plane touched by a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VSide {
    Top,
    Bottom,
}

/// Horizontal side of a plane touched by a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HSide {
    Left,
    Right,
}

/// Handle -> (plane, vertical side, horizontal side) for the perspective
/// step. Horizontal edges carry no side of their own and use `Right`.
pub static PERSPECTIVE: &[(CuboidHandle, Plane, Option<VSide>, HSide)] = &[
    (CuboidHandle::Vertex(V::FrontTl), Plane::Front, Some(VSide::Top), HSide::Left),
    (CuboidHandle::Vertex(V::FrontTr), Plane::Front, Some(VSide::Top), HSide::Right),
    (CuboidHandle::Vertex(V::FrontBr), Plane::Front, Some(VSide::Bottom), HSide::Right),
    (CuboidHandle::Vertex(V::FrontBl), Plane::Front, Some(VSide::Bottom), HSide::Left),
    (CuboidHandle::Vertex(V::BackTl), Plane::Back, Some(VSide::Top), HSide::Left),
    (CuboidHandle::Vertex(V::BackTr), Plane::Back, Some(VSide::Top), HSide::Right),
    (CuboidHandle::Vertex(V::BackBr), Plane::Back, Some(VSide::Bottom), HSide::Right),
    (CuboidHandle::Vertex(V::BackBl), Plane::Back, Some(VSide::Bottom), HSide::Left),
    (CuboidHandle::Edge(E::FrontTop), Plane::Front, Some(VSide::Top), HSide::Right),
    (CuboidHandle::Edge(E::FrontBottom), Plane::Front, Some(VSide::Bottom), HSide::Right),
    (CuboidHandle::Edge(E::FrontLeft), Plane::Front, None, HSide::Left),
    (CuboidHandle::Edge(E::FrontRight), Plane::Front, None, HSide::Right),
    (CuboidHandle::Edge(E::BackTop), Plane::Back, Some(VSide::Top), HSide::Right),
    (CuboidHandle::Edge(E::BackLeft), Plane::Back, None, HSide::Left),
    (CuboidHandle::Edge(E::BackRight), Plane::Back, None, HSide::Right),
];

pub fn relations_for(handle: CuboidHandle) -> &'static [Affect] {
    HANDLE_RELATIONS
        .iter()
        .find(|(h, _)| *h == handle)
        .map(|(_, affects)| *affects)
        .unwrap_or(&[])
}

pub fn perspective_for(handle: CuboidHandle) -> Option<(Plane, Option<VSide>, HSide)> {
    PERSPECTIVE
        .iter()
        .find(|(h, ..)| *h == handle)
        .map(|(_, plane, vside, hside)| (*plane, *vside, *hside))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_draggable_handle_has_relations() {
        for handle in CuboidHandle::draggable() {
            assert!(!relations_for(handle).is_empty(), "{handle} has no relations");
            assert!(perspective_for(handle).is_some(), "{handle} has no perspective entry");
        }
        assert!(relations_for(CuboidHandle::Edge(E::BackBottom)).is_empty());
    }

    #[test]
    fn test_vertex_relations_touch_two_neighbours() {
        for vertex in CuboidVertex::ALL {
            let vertex_targets: Vec<_> = relations_for(CuboidHandle::Vertex(vertex))
                .iter()
                .filter(|a| matches!(a.target, Part::Vertex(_)))
                .collect();
            assert_eq!(vertex_targets.len(), 3);
            assert_eq!(vertex_targets[0].target, Part::Vertex(vertex));
            assert_eq!(vertex_targets[0].field, Field::XY);
        }
    }

    #[test]
    fn test_edge_relations_agree_with_skeleton() {
        // Every vertex touched by an edge handle is one of the edge's ends.
        for (edge, ends) in SKELETON_EDGES {
            for affect in relations_for(CuboidHandle::Edge(edge)) {
                if let Part::Vertex(vertex) = affect.target {
                    assert!(ends.contains(&vertex), "{edge:?} touches {vertex:?}");
                }
            }
        }
    }
}
