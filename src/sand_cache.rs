use indexmap::IndexMap;

use crate::ms_complex::MsComplex;
use crate::striation::Striation;

/// A sand-volume measure for one striation item.
pub type SandFunction = fn(&MsComplex, &Striation, usize) -> f64;

/// Sand volume that matters for water flowing through the item's channel:
/// the volume above the saddle's water level over the item's whole region.
pub fn water_flow_sand_function(msc: &MsComplex, striation: &Striation, item: usize) -> f64 {
    let it = striation.item(item);
    let level = msc.vertex(it.saddle).p.h;
    it.region
        .iter()
        .map(|&f| msc.face(f).volume_above.value_at(level))
        .sum()
}

/// Sand volume counted on the smaller of the two sides the item's path
/// separates; a channel is only as significant as its less massive bank.
pub fn bidirectional_sand_function(msc: &MsComplex, striation: &Striation, item: usize) -> f64 {
    let it = striation.item(item);
    let level = msc.vertex(it.saddle).p.h;
    let side = |faces: &[crate::dcel::FaceIndex]| {
        faces
            .iter()
            .map(|&f| msc.face(f).volume_above.value_at(level))
            .sum::<f64>()
    };
    side(&it.left).min(side(&it.right))
}

/// Memoized sand volumes.
///
/// The network selection probes the same striation items over and over,
/// once per δ value; values are keyed on the item and the bit pattern of
/// the water level they were evaluated at, and computed lazily on first
/// use.
pub struct SandCache<'a> {
    msc: &'a MsComplex,
    striation: &'a Striation,
    sand_function: SandFunction,
    cache: IndexMap<(usize, u64), f64>,
}

impl<'a> SandCache<'a> {
    pub fn new(msc: &'a MsComplex, striation: &'a Striation, sand_function: SandFunction) -> Self {
        SandCache {
            msc,
            striation,
            sand_function,
            cache: IndexMap::new(),
        }
    }

    /// The sand volume of a striation item, at its saddle's water level.
    pub fn sand_volume(&mut self, item: usize) -> f64 {
        let level = self.msc.vertex(self.striation.item(item).saddle).p.h;
        let key = (item, level.to_bits());
        if let Some(&volume) = self.cache.get(&key) {
            return volume;
        }
        let volume = (self.sand_function)(self.msc, self.striation, item);
        self.cache.insert(key, volume);
        volume
    }
}
