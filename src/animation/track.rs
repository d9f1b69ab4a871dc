use super::{Frame, interpolate::Interpolate};

/// How values between two keys are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold the previous key until the next one.
    Constant,
    #[default]
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Key<V> {
    pub frame: Frame,
    pub value: V,
}

/// Keys sorted by frame. Frames outside the keyed range hold the first or last key.
#[derive(Clone, Debug, Default)]
pub struct Track<V: Interpolate> {
    keys: Vec<Key<V>>,
    pub interpolation: Interpolation,
}

impl<V: Interpolate + Default> Track<V> {
    #[inline]
    pub fn keys(&self) -> &[Key<V>] {
        &self.keys
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Value of the key at exactly `frame`, if there is one.
    pub fn key_at(&self, frame: Frame) -> Option<V> {
        self.keys
            .binary_search_by_key(&frame, |k| k.frame)
            .ok()
            .map(|i| self.keys[i].value)
    }

    pub fn insert(&mut self, frame: Frame, value: V) {
        // A second key on the same frame replaces the first.
        match self.keys.binary_search_by_key(&frame, |k| k.frame) {
            Ok(i) => self.keys[i].value = value,
            Err(i) => self.keys.insert(i, Key { frame, value }),
        }
    }

    pub fn extend<I: IntoIterator<Item = (Frame, V)>>(&mut self, it: I) {
        for (frame, value) in it {
            self.insert(frame, value);
        }
    }

    /// Value at a fractional frame, honouring the track's interpolation.
    pub fn sample(&self, frame: f64) -> V {
        if self.keys.is_empty() {
            return V::default();
        }

        if self.keys.len() == 1 {
            return self.keys[0].value;
        }

        let last_idx = self.keys.len() - 1;
        let first = self.keys[0].frame as f64;
        let last = self.keys[last_idx].frame as f64;

        if frame <= first {
            return self.keys[0].value;
        }
        if frame >= last {
            return self.keys[last_idx].value;
        }

        let i = self.keys.partition_point(|k| (k.frame as f64) <= frame);
        let a = &self.keys[i - 1];
        let b = &self.keys[i];

        match self.interpolation {
            Interpolation::Constant => a.value,
            Interpolation::Linear => Self::between(a, b, frame),
        }
    }

    #[inline]
    fn between(a: &Key<V>, b: &Key<V>, f: f64) -> V {
        let t = (f - a.frame as f64) / (b.frame as f64 - a.frame as f64);
        V::interpolate(a.value, b.value, t)
    }
}
