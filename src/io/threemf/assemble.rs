// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Raw records to a [`Document`]
//!
//! Every cross reference is resolved here. A bad reference either fails the
//! read (strict) or drops the offending element and records a diagnostic
//! (lenient). Declared ids are preserved.

use super::parser::{RawBeam, RawBody, RawLattice, RawMesh, RawModel, RawObject, RawTriangle};
use super::Diagnostic;
use crate::error::{ModelError, Result};
use crate::geometry::{Beam, BeamCapMode, Triangle, TriangleProperties};
use crate::model::{
    BuildItem, ColorGroup, ComponentsObject, Document, MeshObject, PropertyRef, Resource,
    ResourceId, DEFAULT_MIN_LENGTH,
};
use tracing::warn;

pub(super) struct Assembler {
    strict: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Assembler {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            diagnostics: Vec::new(),
        }
    }

    /// Fail in strict mode, record and carry on otherwise
    fn tolerate(&mut self, element: impl Into<String>, message: impl Into<String>) -> Result<()> {
        let (element, message) = (element.into(), message.into());
        if self.strict {
            return Err(ModelError::MalformedDocument { element, message });
        }
        warn!(%element, %message, "dropping malformed element");
        self.diagnostics.push(Diagnostic { element, message });
        Ok(())
    }

    pub fn assemble(mut self, raw: RawModel) -> Result<(Document, Vec<Diagnostic>)> {
        let mut document = Document::new();
        if let Some(unit) = raw.unit {
            document.unit = unit;
        }
        *document.metadata_mut() = raw.metadata;

        // property groups first so mesh references can be checked against them
        for group in raw.color_groups {
            let mut colors = ColorGroup::new();
            for color in group.colors {
                colors.add_color(color);
            }
            document.insert_with_id(group.id, Resource::ColorGroup(colors))?;
        }
        for (id, group) in raw.metadata_groups {
            document.insert_with_id(id, Resource::MetadataGroup(group))?;
        }

        // objects go in with empty component lists; the instancing graph is
        // wired once every id is known
        let mut pending_components = Vec::new();
        for object in raw.objects {
            let RawObject {
                id,
                name,
                object_type,
                pid,
                pindex,
                metadata,
                body,
            } = object;

            match body {
                RawBody::Components(components) => {
                    let mut resource = ComponentsObject::new();
                    resource.name = name;
                    resource.metadata = metadata;
                    document.insert_with_id(id, Resource::ComponentsObject(resource))?;
                    pending_components.push((id, components));
                }
                RawBody::Mesh(raw_mesh) => {
                    let mut mesh = self.mesh_object(&document, id, pid, raw_mesh)?;
                    mesh.name = name;
                    mesh.object_type = object_type;
                    mesh.metadata = metadata;
                    if let Some(property) = self.object_property(&document, id, pid, pindex)? {
                        mesh.set_default_property(Some(property));
                    }
                    document.insert_with_id(id, Resource::MeshObject(mesh))?;
                }
                RawBody::Empty => {
                    let mut mesh = MeshObject::new();
                    mesh.name = name;
                    mesh.object_type = object_type;
                    mesh.metadata = metadata;
                    document.insert_with_id(id, Resource::MeshObject(mesh))?;
                }
            }
        }

        for (parent, components) in pending_components {
            for (index, component) in components.into_iter().enumerate() {
                let element = format!("object {parent} / component {index}");
                match document.add_component(parent, component.object, component.transform) {
                    Ok(()) => {}
                    Err(
                        err @ (ModelError::InvalidReference { .. }
                        | ModelError::CyclicInstancing { .. }),
                    ) => self.tolerate(element, err.to_string())?,
                    Err(err) => return Err(err),
                }
            }
        }

        for (index, item) in raw.build.into_iter().enumerate() {
            let element = format!("build / item {index}");
            let placed = BuildItem {
                object: item.object,
                transform: item.transform,
                part_number: item.part_number,
            };
            match document.push_build_item(placed) {
                Ok(()) => {}
                Err(err @ ModelError::InvalidReference { .. }) => {
                    self.tolerate(element, err.to_string())?
                }
                Err(err) => return Err(err),
            }
        }

        Ok((document, self.diagnostics))
    }

    fn mesh_object(
        &mut self,
        document: &Document,
        id: ResourceId,
        object_pid: Option<ResourceId>,
        raw: RawMesh,
    ) -> Result<MeshObject> {
        let vertex_count = raw.vertices.len();
        let mut triangles = Vec::with_capacity(raw.triangles.len());

        for (index, raw_triangle) in raw.triangles.into_iter().enumerate() {
            let element = format!("object {id} / triangle {index}");
            let triangle = Triangle::new(
                raw_triangle.indices[0],
                raw_triangle.indices[1],
                raw_triangle.indices[2],
            );

            if let Some(bad) = triangle.out_of_range_index(vertex_count) {
                self.tolerate(
                    element,
                    format!("vertex index {bad} out of range (vertex count {vertex_count})"),
                )?;
                continue;
            }
            if triangle.is_degenerate() {
                self.tolerate(element, format!("degenerate triangle {:?}", triangle.indices))?;
                continue;
            }

            let properties =
                self.triangle_properties(document, &element, object_pid, &raw_triangle)?;
            triangles.push(triangle.with_properties(properties));
        }

        let mut mesh = MeshObject::new();
        mesh.set_resolved_geometry(raw.vertices, triangles)?;

        if let Some(lattice) = raw.lattice {
            self.beam_lattice(&mut mesh, id, lattice)?;
        }
        Ok(mesh)
    }

    /// Resolve `pid p1 p2 p3`; `pid` falls back to the object's. The triangle
    /// is kept when they are invalid, only the property assignment is dropped.
    fn triangle_properties(
        &mut self,
        document: &Document,
        element: &str,
        object_pid: Option<ResourceId>,
        raw: &RawTriangle,
    ) -> Result<Option<TriangleProperties>> {
        let [p1, p2, p3] = raw.positions;
        let Some(p1) = p1 else {
            return Ok(None);
        };
        let Some(resource) = raw.pid.or(object_pid) else {
            self.tolerate(element, "p1 without pid")?;
            return Ok(None);
        };

        let group = match document.color_group(resource) {
            Ok(group) => group,
            Err(_) => {
                self.tolerate(element, format!("pid {resource} is not a color group"))?;
                return Ok(None);
            }
        };

        let mut indices = [0; 3];
        for (slot, position) in indices.iter_mut().zip([p1, p2.unwrap_or(p1), p3.unwrap_or(p1)]) {
            match group.property_at(position as usize) {
                Some(property) => *slot = property,
                None => {
                    self.tolerate(
                        element,
                        format!("property index {position} out of range in group {resource}"),
                    )?;
                    return Ok(None);
                }
            }
        }
        Ok(Some(TriangleProperties::new(resource, indices)))
    }

    fn object_property(
        &mut self,
        document: &Document,
        id: ResourceId,
        pid: Option<ResourceId>,
        pindex: Option<u32>,
    ) -> Result<Option<PropertyRef>> {
        let Some(resource) = pid else {
            return Ok(None);
        };
        let element = format!("object {id}");
        let position = pindex.unwrap_or(0);

        let index = document
            .color_group(resource)
            .ok()
            .and_then(|group| group.property_at(position as usize));
        match index {
            Some(index) => Ok(Some(PropertyRef { resource, index })),
            None => {
                self.tolerate(
                    element,
                    format!("object property {resource}:{position} does not resolve"),
                )?;
                Ok(None)
            }
        }
    }

    fn beam_lattice(
        &mut self,
        mesh: &mut MeshObject,
        id: ResourceId,
        raw: RawLattice,
    ) -> Result<()> {
        let element = format!("object {id} / beamlattice");

        let mut min_length = raw.min_length.unwrap_or(DEFAULT_MIN_LENGTH);
        if !(min_length.is_finite() && min_length >= 0.0) {
            self.tolerate(&element, format!("invalid minlength {min_length}"))?;
            min_length = DEFAULT_MIN_LENGTH;
        }

        let mut radius = raw.radius.unwrap_or(1.0);
        if !(radius.is_finite() && radius > 0.0) {
            self.tolerate(&element, format!("invalid radius {radius}"))?;
            radius = 1.0;
        }

        let cap = match raw.cap.as_deref().map(str::parse::<BeamCapMode>) {
            None => BeamCapMode::Sphere,
            Some(Ok(cap)) => cap,
            Some(Err(err)) => {
                self.tolerate(&element, err.to_string())?;
                BeamCapMode::Sphere
            }
        };

        mesh.set_beam_min_length(min_length)?;
        mesh.set_beam_defaults(radius, cap)?;

        let mut beams = Vec::with_capacity(raw.beams.len());
        for (index, raw_beam) in raw.beams.into_iter().enumerate() {
            let element = format!("object {id} / beam {index}");
            match resolve_beam(raw_beam, radius, cap) {
                Ok(beam) => {
                    let checked = mesh
                        .beam_lattice()
                        .map(|lattice| lattice.validate_beam(&beam, mesh.vertices()));
                    match checked {
                        Some(Err(err)) => self.tolerate(element, err.to_string())?,
                        _ => beams.push(beam),
                    }
                }
                Err(err) => self.tolerate(element, err.to_string())?,
            }
        }
        mesh.set_beams(beams)
    }
}

/// Apply lattice defaults: `r1` falls back to the lattice radius, `r2` to
/// `r1`, caps to the lattice cap
fn resolve_beam(raw: RawBeam, radius: f64, cap: BeamCapMode) -> Result<Beam> {
    let r1 = raw.radii[0].unwrap_or(radius);
    let r2 = raw.radii[1].unwrap_or(r1);
    let [cap1, cap2] = raw.caps;
    let cap1 = cap1.as_deref().map_or(Ok(cap), str::parse)?;
    let cap2 = cap2.as_deref().map_or(Ok(cap), str::parse)?;
    Ok(Beam::new(raw.indices[0], raw.indices[1], r1, r2, cap1, cap2))
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse_model;
    use super::*;

    fn model(body: &str) -> RawModel {
        let xml = format!(
            r#"<model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
                     xmlns:m="http://schemas.microsoft.com/3dmanufacturing/material/2015/02"
                     xmlns:b="http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02">
                 {body}
               </model>"#
        );
        parse_model(&xml).unwrap()
    }

    const TRIANGLE_WITH_DANGLING_INDEX: &str = r#"
        <resources>
          <object id="1">
            <mesh>
              <vertices>
                <vertex x="0" y="0" z="0"/>
                <vertex x="1" y="0" z="0"/>
                <vertex x="0" y="1" z="0"/>
                <vertex x="0" y="0" z="1"/>
              </vertices>
              <triangles>
                <triangle v1="0" v2="1" v3="2"/>
                <triangle v1="0" v2="1" v3="9"/>
                <triangle v1="0" v2="2" v3="3"/>
              </triangles>
            </mesh>
          </object>
        </resources>
        <build><item objectid="1"/></build>"#;

    #[test]
    fn test_strict_rejects_dangling_triangle() {
        let err = Assembler::new(true)
            .assemble(model(TRIANGLE_WITH_DANGLING_INDEX))
            .unwrap_err();
        match err {
            ModelError::MalformedDocument { element, .. } => {
                assert_eq!(element, "object 1 / triangle 1")
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_lenient_drops_only_the_dangling_triangle() {
        let (document, diagnostics) = Assembler::new(false)
            .assemble(model(TRIANGLE_WITH_DANGLING_INDEX))
            .unwrap();

        let mesh = document.mesh_object(ResourceId::new(1).unwrap()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangles()[1].indices, [0, 2, 3]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].element, "object 1 / triangle 1");
    }

    #[test]
    fn test_duplicate_ids_fatal_in_both_modes() {
        let body = r##"<resources>
            <m:colorgroup id="4"><m:color color="#FFFFFF"/></m:colorgroup>
            <object id="4"><mesh><vertices/><triangles/></mesh></object>
          </resources>"##;
        for strict in [true, false] {
            assert!(matches!(
                Assembler::new(strict).assemble(model(body)),
                Err(ModelError::MalformedDocument { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_cap_fails_closed() {
        let body = r#"<resources>
            <object id="1"><mesh>
              <vertices><vertex x="0" y="0" z="0"/><vertex x="5" y="0" z="0"/></vertices>
              <triangles/>
              <b:beamlattice radius="1" minlength="0.01">
                <b:beams>
                  <b:beam v1="0" v2="1" cap1="rounded"/>
                  <b:beam v1="1" v2="0" r1="2" cap2="butt"/>
                </b:beams>
              </b:beamlattice>
            </mesh></object>
          </resources>"#;

        assert!(Assembler::new(true).assemble(model(body)).is_err());

        let (document, diagnostics) = Assembler::new(false).assemble(model(body)).unwrap();
        let mesh = document.mesh_object(ResourceId::new(1).unwrap()).unwrap();
        let lattice = mesh.beam_lattice().unwrap();
        assert_eq!(lattice.beam_count(), 1);
        assert_eq!(lattice.beams()[0].radii, [2.0, 2.0]);
        assert_eq!(lattice.beams()[0].caps, [BeamCapMode::Sphere, BeamCapMode::Butt]);
        assert_eq!(lattice.min_length(), 0.01);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_cycles_and_dangling_components() {
        let body = r#"<resources>
            <object id="1"><components><component objectid="2"/></components></object>
            <object id="2"><components>
              <component objectid="1"/>
              <component objectid="7"/>
            </components></object>
          </resources>
          <build><item objectid="1"/><item objectid="8"/></build>"#;

        assert!(Assembler::new(true).assemble(model(body)).is_err());

        let (document, diagnostics) = Assembler::new(false).assemble(model(body)).unwrap();
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(document.build_item_count(), 1);
        let a = document.components_object(ResourceId::new(1).unwrap()).unwrap();
        let b = document.components_object(ResourceId::new(2).unwrap()).unwrap();
        assert_eq!(a.component_count() + b.component_count(), 1);
    }

    #[test]
    fn test_dangling_property_is_cleared() {
        let body = r##"<resources>
            <m:colorgroup id="1"><m:color color="#FF0000"/></m:colorgroup>
            <object id="2" pid="1" pindex="3"><mesh>
              <vertices>
                <vertex x="0" y="0" z="0"/>
                <vertex x="1" y="0" z="0"/>
                <vertex x="0" y="1" z="0"/>
              </vertices>
              <triangles>
                <triangle v1="0" v2="1" v3="2" pid="1" p1="0" p2="0" p3="5"/>
              </triangles>
            </mesh></object>
          </resources>"##;

        assert!(Assembler::new(true).assemble(model(body)).is_err());

        let (document, diagnostics) = Assembler::new(false).assemble(model(body)).unwrap();
        let mesh = document.mesh_object(ResourceId::new(2).unwrap()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.triangles()[0].properties().is_none());
        assert!(mesh.default_property().is_none());
        assert_eq!(diagnostics.len(), 2);
    }
}
