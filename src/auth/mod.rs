/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
pub(crate) mod dto;
pub(crate) mod handler;
pub(crate) mod middleware;
pub(crate) mod routes;
pub(crate) mod service;

/// The three session populations a bearer token or refresh cookie can
/// belong to (spec.md §3, Glossary "Audience").
pub const AUD_BACKOFFICE: &str = "backoffice";
pub const AUD_CITIZEN: &str = "citizen";
pub const AUD_SAAS: &str = "saas";

/// Cookie precedence when more than one refresh cookie is present on
/// `/auth/refresh` (spec.md §9 Open Questions, resolved in DESIGN.md).
pub const REFRESH_COOKIE_PRECEDENCE: [&str; 3] = [AUD_SAAS, AUD_BACKOFFICE, AUD_CITIZEN];
